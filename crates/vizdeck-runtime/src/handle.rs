//! Cloneable client handle to the session resolver
//!
//! A [`SessionHandle`] is cheap to clone and safe to share: every method
//! serializes through the resolver task's command channel, so callers never
//! observe a half-finished resolution.

use tokio::sync::oneshot;

use vizdeck_core::{FederatedProvider, Identity, VizdeckError, VizdeckResult};

use crate::commands::{CommandSender, SessionCommand, SessionState, StateReceiver};

// ----------------------------------------------------------------------------
// Session Handle
// ----------------------------------------------------------------------------

/// Handle for interacting with the session resolver task
#[derive(Clone)]
pub struct SessionHandle {
    commands: CommandSender,
    state: StateReceiver,
}

impl SessionHandle {
    pub(crate) fn new(commands: CommandSender, state: StateReceiver) -> Self {
        Self { commands, state }
    }

    /// The current session state without waiting
    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// The current identity, if startup resolution has completed
    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity().cloned()
    }

    /// Wait until startup resolution has completed, returning the identity
    pub async fn wait_resolved(&mut self) -> VizdeckResult<Identity> {
        let state = self
            .state
            .wait_for(SessionState::is_resolved)
            .await
            .map_err(|_| VizdeckError::channel_closed("session state"))?;
        match &*state {
            SessionState::Resolved(identity) => Ok(identity.clone()),
            // wait_for only returns states passing the predicate
            SessionState::Initializing => Err(VizdeckError::channel_closed("session state")),
        }
    }

    /// A fresh receiver for observing identity changes
    pub fn subscribe(&self) -> StateReceiver {
        self.state.clone()
    }

    /// Re-run identity resolution and return the result
    pub async fn resolve(&self) -> VizdeckResult<Identity> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionCommand::Resolve {
            reply: Some(reply_tx),
        })
        .await?;
        self.receive(reply_rx).await
    }

    /// Sign in with username and password.
    ///
    /// On success the resolved authenticated identity is returned; on
    /// failure the provider's error passes through and the current identity
    /// is unchanged.
    pub async fn sign_in(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> VizdeckResult<Identity> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionCommand::SignIn {
            username: username.into(),
            password: password.into(),
            reply: reply_tx,
        })
        .await?;
        self.receive(reply_rx).await?
    }

    /// Sign out, always landing on a guest identity
    pub async fn sign_out(&self) -> VizdeckResult<Identity> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionCommand::SignOut { reply: reply_tx }).await?;
        self.receive(reply_rx).await
    }

    /// Adopt a guest identity without consulting the provider; idempotent
    pub async fn continue_as_guest(&self) -> VizdeckResult<Identity> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionCommand::ContinueAsGuest { reply: reply_tx })
            .await?;
        self.receive(reply_rx).await
    }

    /// Start a federated redirect sign-in.
    ///
    /// Returns once the redirect has been initiated; the identity updates
    /// later, when the provider reports completion on its event stream.
    pub async fn sign_in_with_redirect(&self, provider: FederatedProvider) -> VizdeckResult<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionCommand::SignInWithRedirect {
            provider,
            reply: reply_tx,
        })
        .await?;
        self.receive(reply_rx).await?
    }

    /// Re-fetch the bound profile for the current identity
    pub async fn refresh_profile(&self) -> VizdeckResult<Identity> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionCommand::RefreshProfile { reply: reply_tx })
            .await?;
        self.receive(reply_rx).await?
    }

    /// Ask the resolver task to stop
    pub async fn shutdown(&self) -> VizdeckResult<()> {
        self.send(SessionCommand::Shutdown).await
    }

    async fn send(&self, command: SessionCommand) -> VizdeckResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| VizdeckError::channel_closed("session commands"))
    }

    async fn receive<T>(&self, reply: oneshot::Receiver<T>) -> VizdeckResult<T> {
        reply
            .await
            .map_err(|_| VizdeckError::channel_closed("session reply"))
    }
}
