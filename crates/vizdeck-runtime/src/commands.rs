//! Typed channel protocol for the session resolver
//!
//! All interaction with the resolver task flows through these message
//! types: commands in over an mpsc channel (with oneshot reply slots), the
//! resolved state out over a watch channel. Asynchronous provider
//! notifications arrive on the provider's own event channel, consumed by
//! the same task, so identity publication is always serialized.

use tokio::sync::{mpsc, oneshot, watch};

use vizdeck_core::{FederatedProvider, Identity, VizdeckResult};

// ----------------------------------------------------------------------------
// Session State
// ----------------------------------------------------------------------------

/// The resolver's published state.
///
/// Starts at `Initializing` and moves to `Resolved` after the startup
/// resolution; it never leaves `Resolved` afterwards, only replaces the
/// identity atomically.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Startup resolution has not completed yet
    Initializing,
    /// The current authoritative identity
    Resolved(Identity),
}

impl SessionState {
    /// The resolved identity, if resolution has completed
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::Initializing => None,
            SessionState::Resolved(identity) => Some(identity),
        }
    }

    /// Whether startup resolution has completed
    pub fn is_resolved(&self) -> bool {
        matches!(self, SessionState::Resolved(_))
    }
}

// ----------------------------------------------------------------------------
// Commands: Callers → Resolver Task
// ----------------------------------------------------------------------------

/// Commands sent from handles to the resolver task
#[derive(Debug)]
pub enum SessionCommand {
    /// Re-run identity resolution against the current provider session.
    /// The reply is optional so internal triggers can fire-and-forget.
    Resolve {
        reply: Option<oneshot::Sender<Identity>>,
    },
    /// Sign in with username and password; on success the reply carries the
    /// freshly resolved identity
    SignIn {
        username: String,
        password: String,
        reply: oneshot::Sender<VizdeckResult<Identity>>,
    },
    /// Sign out; the reply always carries a guest identity
    SignOut {
        reply: oneshot::Sender<Identity>,
    },
    /// Force a guest identity without consulting the provider; idempotent
    ContinueAsGuest {
        reply: oneshot::Sender<Identity>,
    },
    /// Start a federated redirect sign-in; completion arrives via the
    /// provider event stream
    SignInWithRedirect {
        provider: FederatedProvider,
        reply: oneshot::Sender<VizdeckResult<()>>,
    },
    /// Re-fetch the bound profile for an authenticated identity
    RefreshProfile {
        reply: oneshot::Sender<VizdeckResult<Identity>>,
    },
    /// Stop the resolver task
    Shutdown,
}

// ----------------------------------------------------------------------------
// Channel Aliases
// ----------------------------------------------------------------------------

pub type CommandSender = mpsc::Sender<SessionCommand>;
pub type CommandReceiver = mpsc::Receiver<SessionCommand>;
pub type StateSender = watch::Sender<SessionState>;
pub type StateReceiver = watch::Receiver<SessionState>;

/// Create the command channel from a channel configuration
pub fn create_command_channel(
    config: &vizdeck_core::ChannelConfig,
) -> (CommandSender, CommandReceiver) {
    mpsc::channel(config.command_buffer_size)
}

/// Create the state channel, starting at `Initializing`
pub fn create_state_channel() -> (StateSender, StateReceiver) {
    watch::channel(SessionState::Initializing)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use vizdeck_core::GuestToken;

    #[test]
    fn test_session_state_accessors() {
        assert!(!SessionState::Initializing.is_resolved());
        assert_eq!(SessionState::Initializing.identity(), None);

        let identity = Identity::guest(GuestToken::new("t-1"), true);
        let state = SessionState::Resolved(identity.clone());
        assert!(state.is_resolved());
        assert_eq!(state.identity(), Some(&identity));
    }
}
