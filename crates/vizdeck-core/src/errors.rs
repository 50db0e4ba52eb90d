//! Error types for the vizdeck engine
//!
//! This module contains all error types used throughout the engine: the
//! authentication provider taxonomy (passed through unreinterpreted), device
//! storage errors, repository errors, and the main VizdeckError type that
//! unifies them all.

// ----------------------------------------------------------------------------
// Authentication Errors
// ----------------------------------------------------------------------------

/// Errors surfaced by the authentication provider.
///
/// The taxonomy is owned by the provider; the engine passes these through to
/// callers without reinterpreting them. `NoSession` is expected and triggers
/// the guest fallback rather than being treated as a failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AuthError {
    #[error("no active session")]
    NoSession,
    #[error("invalid credentials")]
    InvalidCredential,
    #[error("account not confirmed")]
    NotConfirmed,
    #[error("rate limited by provider")]
    RateLimited,
    #[error("provider error: {message}")]
    Provider { message: String },
}

// ----------------------------------------------------------------------------
// Device Storage Errors
// ----------------------------------------------------------------------------

/// Errors from the device-local key-value storage backing the guest store
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StorageError {
    #[error("device storage not available")]
    Unavailable,
    #[error("access denied to device storage")]
    AccessDenied,
    #[error("storage I/O error: {message}")]
    Io { message: String },
}

// ----------------------------------------------------------------------------
// Repository Errors
// ----------------------------------------------------------------------------

/// Errors from the profile and setting repositories.
///
/// Setting read/write failures are surfaced to the caller un-retried; the
/// caller decides whether to retry. `Conflict` covers the profile-create
/// race, which the resolver recovers from by re-querying once.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found: {id}")]
    NotFound { id: String },
    #[error("write conflict: {reason}")]
    Conflict { reason: String },
    #[error("repository backend error: {message}")]
    Backend { message: String },
}

// ----------------------------------------------------------------------------
// Channel Errors
// ----------------------------------------------------------------------------

/// Errors from inter-task channel communication
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChannelError {
    #[error("channel closed: {endpoint}")]
    Closed { endpoint: String },
}

// ----------------------------------------------------------------------------
// Unified Error Type
// ----------------------------------------------------------------------------

/// Core error type for the vizdeck engine
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VizdeckError {
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// An authenticated identity has no bound profile record, so it cannot
    /// own or claim setting records
    #[error("authenticated identity has no bound profile")]
    UnboundProfile,

    /// Configuration error
    #[error("configuration error: {reason}")]
    Configuration { reason: String },
}

// ----------------------------------------------------------------------------
// Convenience Error Constructors
// ----------------------------------------------------------------------------

impl AuthError {
    /// Create a provider error with a message
    pub fn provider<T: Into<String>>(message: T) -> Self {
        AuthError::Provider {
            message: message.into(),
        }
    }
}

impl StorageError {
    /// Create an I/O storage error with a message
    pub fn io<T: Into<String>>(message: T) -> Self {
        StorageError::Io {
            message: message.into(),
        }
    }
}

impl RepositoryError {
    /// Create a not-found error for a record id
    pub fn not_found<T: Into<String>>(id: T) -> Self {
        RepositoryError::NotFound { id: id.into() }
    }

    /// Create a conflict error with a reason
    pub fn conflict<T: Into<String>>(reason: T) -> Self {
        RepositoryError::Conflict {
            reason: reason.into(),
        }
    }

    /// Create a backend error with a message
    pub fn backend<T: Into<String>>(message: T) -> Self {
        RepositoryError::Backend {
            message: message.into(),
        }
    }
}

impl VizdeckError {
    /// Create a channel-closed error for an endpoint
    pub fn channel_closed<T: Into<String>>(endpoint: T) -> Self {
        VizdeckError::Channel(ChannelError::Closed {
            endpoint: endpoint.into(),
        })
    }

    /// Create a configuration error with a reason
    pub fn config_error<T: Into<String>>(reason: T) -> Self {
        VizdeckError::Configuration {
            reason: reason.into(),
        }
    }
}

// ----------------------------------------------------------------------------
// Type Aliases
// ----------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, VizdeckError>;
pub type VizdeckResult<T> = Result<T>;

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VizdeckError::from(AuthError::NoSession);
        assert_eq!(format!("{}", err), "authentication error: no active session");

        let err = VizdeckError::from(RepositoryError::not_found("s-1"));
        assert_eq!(format!("{}", err), "repository error: record not found: s-1");
    }

    #[test]
    fn test_provider_errors_pass_through() {
        let err = AuthError::provider("UserNotFoundException");
        match err {
            AuthError::Provider { message } => assert_eq!(message, "UserNotFoundException"),
            _ => panic!("wrong variant"),
        }
    }
}
