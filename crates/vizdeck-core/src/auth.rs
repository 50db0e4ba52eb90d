//! Authentication provider contract
//!
//! The engine treats the authentication provider as an opaque external
//! collaborator: it asks for the current session, delegates sign-in and
//! sign-out, and consumes a stream of lifecycle notifications. The provider's
//! error taxonomy is surfaced unchanged; only its observable outcomes matter
//! here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::errors::AuthError;
use crate::types::SubjectId;

// ----------------------------------------------------------------------------
// Session
// ----------------------------------------------------------------------------

/// A snapshot of the provider's current authenticated session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    /// Stable account subject id
    pub subject_id: SubjectId,
    /// Username or other human label the provider reports
    pub display_name: String,
    /// Login email, when the provider reports one
    pub email: Option<String>,
}

// ----------------------------------------------------------------------------
// Lifecycle Events
// ----------------------------------------------------------------------------

/// Asynchronous session-lifecycle notifications from the provider.
///
/// Federated redirect sign-in completes out-of-band (control leaves the
/// process), so its outcome arrives here rather than as a call return value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthLifecycleEvent {
    /// A sign-in completed; the current session should be re-resolved
    SignedIn,
    /// A sign-in attempt failed; the current identity is unchanged
    SignInFailed { reason: String },
    /// The session ended; re-resolution falls back to guest
    SignedOut,
}

/// Receiving half of a provider event subscription
pub type AuthEventReceiver = mpsc::UnboundedReceiver<AuthLifecycleEvent>;

// ----------------------------------------------------------------------------
// Federated Providers
// ----------------------------------------------------------------------------

/// External OAuth providers supported for redirect sign-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FederatedProvider {
    Google,
    Facebook,
    Amazon,
    Apple,
}

impl core::fmt::Display for FederatedProvider {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FederatedProvider::Google => write!(f, "Google"),
            FederatedProvider::Facebook => write!(f, "Facebook"),
            FederatedProvider::Amazon => write!(f, "Amazon"),
            FederatedProvider::Apple => write!(f, "Apple"),
        }
    }
}

// ----------------------------------------------------------------------------
// Provider Trait
// ----------------------------------------------------------------------------

/// External authentication provider.
///
/// Implementations must deliver lifecycle events through the channel handed
/// out by `subscribe`; the session resolver establishes exactly one
/// subscription for the process lifetime.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Look up the current session. `Err(NoSession)` is the expected outcome
    /// when nobody is signed in and triggers the guest fallback.
    async fn current_session(&self) -> Result<AuthSession, AuthError>;

    /// Sign in with username and password. On success the caller re-queries
    /// the current session rather than trusting a returned snapshot.
    async fn sign_in(&self, username: &str, password: &str) -> Result<(), AuthError>;

    /// Sign out the current session
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Start a federated redirect sign-in. Completion arrives on the event
    /// stream, not as a return value.
    async fn sign_in_with_redirect(&self, provider: FederatedProvider) -> Result<(), AuthError>;

    /// Subscribe to session-lifecycle notifications
    fn subscribe(&self) -> AuthEventReceiver;
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_federated_provider_display() {
        assert_eq!(format!("{}", FederatedProvider::Google), "Google");
        assert_eq!(format!("{}", FederatedProvider::Apple), "Apple");
    }
}
