//! The resolved acting identity
//!
//! Exactly one [`Identity`] is authoritative at any instant: either an
//! anonymous device-bound guest or an authenticated account. The tagged
//! variants carry only the fields valid for that kind, so there is no
//! ambiguous "maybe has a profile / maybe has a session id" state to
//! null-check.

use serde::{Deserialize, Serialize};

use crate::types::{GuestToken, ProfileId, SubjectId};

/// Display name used for all guest identities
pub const GUEST_DISPLAY_NAME: &str = "Guest";

// ----------------------------------------------------------------------------
// Identity
// ----------------------------------------------------------------------------

/// The authoritative acting principal at a point in time.
///
/// Identities are immutable values: re-resolving a stable underlying session
/// yields an equal value, and equality (not allocation identity) is what
/// subscribers may rely on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Identity {
    /// An account authenticated against the provider
    Authenticated {
        /// The provider's stable account subject id
        subject_id: SubjectId,
        /// Best-effort human label (username or email)
        display_name: String,
        /// Login email, when the session carries one
        email: Option<String>,
        /// Bound profile record, absent only when profile resolution failed
        /// non-fatally (the user is never blocked on profile creation)
        profile_ref: Option<ProfileId>,
    },
    /// An anonymous device-bound guest
    Guest {
        /// Stable token for this device, until explicitly cleared
        device_session_id: GuestToken,
        /// False when storage was unavailable and the token only lives for
        /// this process
        persisted: bool,
    },
}

impl Identity {
    /// Create an authenticated identity
    pub fn authenticated(
        subject_id: SubjectId,
        display_name: impl Into<String>,
        email: Option<String>,
        profile_ref: Option<ProfileId>,
    ) -> Self {
        Identity::Authenticated {
            subject_id,
            display_name: display_name.into(),
            email,
            profile_ref,
        }
    }

    /// Create a guest identity from a device session token
    pub fn guest(device_session_id: GuestToken, persisted: bool) -> Self {
        Identity::Guest {
            device_session_id,
            persisted,
        }
    }

    /// Stable unique subject id for this identity (`guest-<token>` for guests)
    pub fn subject_id(&self) -> SubjectId {
        match self {
            Identity::Authenticated { subject_id, .. } => subject_id.clone(),
            Identity::Guest {
                device_session_id, ..
            } => device_session_id.to_subject_id(),
        }
    }

    /// Best-effort human label
    pub fn display_name(&self) -> &str {
        match self {
            Identity::Authenticated { display_name, .. } => display_name,
            Identity::Guest { .. } => GUEST_DISPLAY_NAME,
        }
    }

    /// Login email, for authenticated identities that carry one
    pub fn email(&self) -> Option<&str> {
        match self {
            Identity::Authenticated { email, .. } => email.as_deref(),
            Identity::Guest { .. } => None,
        }
    }

    /// Bound profile record, for authenticated identities
    pub fn profile_ref(&self) -> Option<&ProfileId> {
        match self {
            Identity::Authenticated { profile_ref, .. } => profile_ref.as_ref(),
            Identity::Guest { .. } => None,
        }
    }

    /// Device session token, for guest identities
    pub fn device_session_id(&self) -> Option<&GuestToken> {
        match self {
            Identity::Authenticated { .. } => None,
            Identity::Guest {
                device_session_id, ..
            } => Some(device_session_id),
        }
    }

    /// Whether this identity is a guest
    pub fn is_guest(&self) -> bool {
        matches!(self, Identity::Guest { .. })
    }

    /// Whether this identity is authenticated
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::Authenticated { .. })
    }

    /// The ownership key this identity reads and writes settings under.
    ///
    /// Returns `None` for an authenticated identity with no bound profile:
    /// such an identity can use the app but cannot own persisted settings.
    pub fn ownership_key(&self) -> Option<OwnershipKey> {
        match self {
            Identity::Authenticated { profile_ref, .. } => {
                profile_ref.clone().map(OwnershipKey::Profile)
            }
            Identity::Guest {
                device_session_id, ..
            } => Some(OwnershipKey::Device(device_session_id.clone())),
        }
    }
}

// ----------------------------------------------------------------------------
// Ownership Key
// ----------------------------------------------------------------------------

/// The field on a persisted setting that determines which identity may
/// filter or claim it. Exactly one key is attached at creation; it is never
/// silently changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OwnershipKey {
    /// Owned by an authenticated account's profile record
    Profile(ProfileId),
    /// Owned by an anonymous device session
    Device(GuestToken),
}

impl core::fmt::Display for OwnershipKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            OwnershipKey::Profile(id) => write!(f, "profile:{}", id),
            OwnershipKey::Device(token) => write!(f, "device:{}", token),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
