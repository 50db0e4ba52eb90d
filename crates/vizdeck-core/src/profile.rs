//! Account profile records
//!
//! A profile is the durable account-linked record created on first
//! successful authentication. The engine references profiles by id
//! (the setting ownership key) and never duplicates their contents into
//! the identity.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::RepositoryError;
use crate::types::{ProfileId, SubjectId};

// ----------------------------------------------------------------------------
// Profile
// ----------------------------------------------------------------------------

/// Durable per-account profile record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Repository-assigned record id
    pub id: ProfileId,
    /// Account subject id; unique and immutable
    pub subject_id: SubjectId,
    /// Human label chosen at creation
    pub display_name: String,
    /// Login email
    pub email: String,
    /// Optional attributes editable after creation
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub timezone: Option<String>,
}

/// Fields required to create a profile on first authentication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProfile {
    pub subject_id: SubjectId,
    pub display_name: String,
    pub email: String,
}

impl NewProfile {
    /// Build a new-profile request from session data
    pub fn from_session(session: &crate::auth::AuthSession) -> Self {
        Self {
            subject_id: session.subject_id.clone(),
            display_name: session.display_name.clone(),
            email: session.email.clone().unwrap_or_default(),
        }
    }
}

// ----------------------------------------------------------------------------
// Repository Trait
// ----------------------------------------------------------------------------

/// External store of profile records.
///
/// Creation happens exactly once per subject; concurrent creation from
/// another tab or process surfaces as `Conflict`, which the resolver
/// recovers from by re-querying once.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Find the profile for an account subject
    async fn find_by_subject(
        &self,
        subject_id: &SubjectId,
    ) -> Result<Option<Profile>, RepositoryError>;

    /// Create the profile for an account subject
    async fn create(&self, profile: NewProfile) -> Result<Profile, RepositoryError>;
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthSession;

    #[test]
    fn test_new_profile_from_session() {
        let session = AuthSession {
            subject_id: SubjectId::new("u-42"),
            display_name: "ada".to_string(),
            email: Some("ada@example.com".to_string()),
        };
        let new_profile = NewProfile::from_session(&session);
        assert_eq!(new_profile.subject_id, SubjectId::new("u-42"));
        assert_eq!(new_profile.email, "ada@example.com");
    }

    #[test]
    fn test_new_profile_without_email() {
        let session = AuthSession {
            subject_id: SubjectId::new("u-7"),
            display_name: "grace".to_string(),
            email: None,
        };
        assert_eq!(NewProfile::from_session(&session).email, "");
    }
}
