//! Session resolver task
//!
//! A single tokio task owns the current identity: it combines the
//! authentication provider, the profile repository, and the guest identity
//! store into one authoritative [`Identity`], published through a watch
//! channel. Commands and asynchronous provider notifications are consumed by
//! the same select loop, so every resolution runs to completion before its
//! result is published and concurrent triggers coalesce into sequential,
//! idempotent resolutions. A second trigger re-runs resolution but can
//! never interleave with one in flight.

use std::sync::Arc;

use tracing::{debug, info, warn};

use vizdeck_core::{
    AuthError, AuthEventReceiver, AuthLifecycleEvent, AuthProvider, AuthSession,
    GuestIdentityStore, Identity, NewProfile, ProfileRepository, VizdeckResult,
};

use crate::commands::{CommandReceiver, SessionCommand, SessionState, StateSender};

// ----------------------------------------------------------------------------
// Session Resolver Task
// ----------------------------------------------------------------------------

/// The task that resolves and publishes the current identity
pub struct SessionResolverTask {
    /// External authentication provider
    auth: Arc<dyn AuthProvider>,
    /// External profile repository
    profiles: Arc<dyn ProfileRepository>,
    /// Device-local guest token store
    guest_store: GuestIdentityStore,
    /// Channel for receiving commands from handles
    command_receiver: CommandReceiver,
    /// Provider lifecycle notifications; the subscription is established
    /// exactly once, when the task is constructed
    auth_events: AuthEventReceiver,
    /// Whether the provider event stream is still open
    auth_events_open: bool,
    /// Publication side of the session state
    state_sender: StateSender,
    /// Whether the task should continue running
    running: bool,
}

impl SessionResolverTask {
    /// Create a new resolver task. Subscribes to the provider's event
    /// stream; constructing a second task over the same provider would
    /// duplicate resolution triggers, so the runtime builds exactly one.
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        profiles: Arc<dyn ProfileRepository>,
        guest_store: GuestIdentityStore,
        command_receiver: CommandReceiver,
        state_sender: StateSender,
    ) -> Self {
        let auth_events = auth.subscribe();
        Self {
            auth,
            profiles,
            guest_store,
            command_receiver,
            auth_events,
            auth_events_open: true,
            state_sender,
            running: true,
        }
    }

    /// Run the resolver loop for the process lifetime.
    ///
    /// Resolves once at startup, then reacts to commands and provider
    /// events until shut down or until every command sender is dropped.
    pub async fn run(&mut self) -> VizdeckResult<()> {
        info!("session resolver starting");

        let identity = self.resolve().await;
        self.publish(identity);

        while self.running {
            tokio::select! {
                command = self.command_receiver.recv() => {
                    match command {
                        Some(command) => self.process_command(command).await,
                        None => {
                            info!("command channel closed, shutting down session resolver");
                            break;
                        }
                    }
                }

                event = self.auth_events.recv(), if self.auth_events_open => {
                    match event {
                        Some(event) => self.process_event(event).await,
                        None => {
                            debug!("auth event stream closed");
                            self.auth_events_open = false;
                        }
                    }
                }
            }
        }

        info!("session resolver stopped");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Command Processing
    // ------------------------------------------------------------------------

    async fn process_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Resolve { reply } => {
                let identity = self.resolve().await;
                self.publish(identity.clone());
                if let Some(reply) = reply {
                    let _ = reply.send(identity);
                }
            }
            SessionCommand::SignIn {
                username,
                password,
                reply,
            } => {
                let result = self.handle_sign_in(&username, &password).await;
                let _ = reply.send(result);
            }
            SessionCommand::SignOut { reply } => {
                let identity = self.handle_sign_out().await;
                let _ = reply.send(identity);
            }
            SessionCommand::ContinueAsGuest { reply } => {
                let identity = self.handle_continue_as_guest();
                let _ = reply.send(identity);
            }
            SessionCommand::SignInWithRedirect { provider, reply } => {
                debug!(%provider, "starting federated redirect sign-in");
                let result = self
                    .auth
                    .sign_in_with_redirect(provider)
                    .await
                    .map_err(Into::into);
                let _ = reply.send(result);
            }
            SessionCommand::RefreshProfile { reply } => {
                let result = self.handle_refresh_profile().await;
                let _ = reply.send(result);
            }
            SessionCommand::Shutdown => {
                self.running = false;
            }
        }
    }

    async fn process_event(&mut self, event: AuthLifecycleEvent) {
        match event {
            AuthLifecycleEvent::SignedIn => {
                debug!("provider reported sign-in, re-resolving");
                let identity = self.resolve().await;
                self.publish(identity);
            }
            AuthLifecycleEvent::SignInFailed { reason } => {
                // Identity unchanged; the attempt simply failed
                warn!(%reason, "asynchronous sign-in failed");
            }
            AuthLifecycleEvent::SignedOut => {
                debug!("provider reported sign-out, re-resolving");
                let identity = self.resolve().await;
                self.publish(identity);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------------

    /// Resolve the current identity. Never fails: any resolution failure
    /// falls back to a guest identity, so the user is never left without an
    /// acting identity.
    async fn resolve(&mut self) -> Identity {
        match self.auth.current_session().await {
            Ok(session) => self.resolve_authenticated(session).await,
            Err(AuthError::NoSession) => self.guest_identity(),
            Err(err) => {
                warn!(error = %err, "session lookup failed, falling back to guest");
                self.guest_identity()
            }
        }
    }

    /// Fetch or create the profile for an authenticated session.
    ///
    /// Profile failures are non-fatal: the identity is still authenticated,
    /// just without a bound profile, rather than blocking the user.
    async fn resolve_authenticated(&self, session: AuthSession) -> Identity {
        let profile_ref = match self.profiles.find_by_subject(&session.subject_id).await {
            Ok(Some(profile)) => Some(profile.id),
            Ok(None) => match self.profiles.create(NewProfile::from_session(&session)).await {
                Ok(profile) => Some(profile.id),
                Err(create_err) => {
                    // Likely lost a create race against another tab; the
                    // winner's record should now be visible
                    debug!(
                        subject = %session.subject_id,
                        error = %create_err,
                        "profile create failed, re-querying"
                    );
                    match self.profiles.find_by_subject(&session.subject_id).await {
                        Ok(Some(profile)) => Some(profile.id),
                        Ok(None) | Err(_) => {
                            warn!(
                                subject = %session.subject_id,
                                error = %create_err,
                                "profile unavailable, continuing without one"
                            );
                            None
                        }
                    }
                }
            },
            Err(err) => {
                warn!(
                    subject = %session.subject_id,
                    error = %err,
                    "profile lookup failed, continuing without one"
                );
                None
            }
        };

        Identity::authenticated(
            session.subject_id,
            session.display_name,
            session.email,
            profile_ref,
        )
    }

    fn guest_identity(&mut self) -> Identity {
        let session = self.guest_store.get_or_create();
        Identity::guest(session.token, session.persisted)
    }

    /// Replace the published identity atomically. Re-resolving a stable
    /// session produces an equal value and does not wake subscribers.
    fn publish(&self, identity: Identity) {
        self.state_sender.send_if_modified(|state| {
            let next = SessionState::Resolved(identity.clone());
            if *state == next {
                false
            } else {
                *state = next;
                true
            }
        });
    }

    // ------------------------------------------------------------------------
    // Operation Handlers
    // ------------------------------------------------------------------------

    async fn handle_sign_in(
        &mut self,
        username: &str,
        password: &str,
    ) -> VizdeckResult<Identity> {
        // Provider errors pass through unchanged; the identity does not move
        self.auth.sign_in(username, password).await?;

        // Resolve immediately rather than waiting for the provider event,
        // so the caller can act on the result synchronously; the event that
        // follows re-runs an idempotent resolution
        let identity = self.resolve().await;
        self.publish(identity.clone());
        Ok(identity)
    }

    /// Sign-out never fails the transition to guest: the remote call's
    /// error is logged and the local identity is reset regardless.
    async fn handle_sign_out(&mut self) -> Identity {
        if let Err(err) = self.auth.sign_out().await {
            warn!(error = %err, "remote sign-out failed, resetting local identity anyway");
        }

        let identity = self.guest_identity();
        self.publish(identity.clone());
        identity
    }

    /// Idempotent: an already-guest identity is returned as-is, without
    /// consulting the provider.
    fn handle_continue_as_guest(&mut self) -> Identity {
        if let SessionState::Resolved(identity) = &*self.state_sender.borrow() {
            if identity.is_guest() {
                return identity.clone();
            }
        }

        let identity = self.guest_identity();
        self.publish(identity.clone());
        identity
    }

    async fn handle_refresh_profile(&mut self) -> VizdeckResult<Identity> {
        let current = self.state_sender.borrow().identity().cloned();
        match current {
            Some(identity) if identity.is_guest() => Ok(identity),
            _ => {
                // Full re-resolution refreshes the profile binding and also
                // covers the not-yet-resolved case
                let identity = self.resolve().await;
                self.publish(identity.clone());
                Ok(identity)
            }
        }
    }
}
