//! Runtime assembly
//!
//! Wires the external collaborators, the guest identity store, and the
//! channel protocol into a single spawned resolver task, and hands back the
//! [`SessionHandle`] clients use to talk to it.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use vizdeck_core::{
    AuthProvider, DeviceStorage, GuestIdentityStore, ProfileRepository, ResolverConfig,
    VizdeckError, VizdeckResult,
};

use crate::commands::{create_command_channel, create_state_channel};
use crate::handle::SessionHandle;
use crate::session::SessionResolverTask;

// ----------------------------------------------------------------------------
// Session Runtime
// ----------------------------------------------------------------------------

/// Owns the spawned resolver task for the lifetime of the application
pub struct SessionRuntime {
    handle: SessionHandle,
    task: Option<JoinHandle<VizdeckResult<()>>>,
}

impl SessionRuntime {
    /// Validate the configuration, build the channels and guest store, and
    /// spawn the resolver task.
    pub fn start(
        config: ResolverConfig,
        auth: Arc<dyn AuthProvider>,
        profiles: Arc<dyn ProfileRepository>,
        guest_storage: Box<dyn DeviceStorage>,
    ) -> VizdeckResult<Self> {
        config.validate().map_err(VizdeckError::config_error)?;

        let guest_store =
            GuestIdentityStore::with_key(guest_storage, config.guest.storage_key.clone());
        let (command_tx, command_rx) = create_command_channel(&config.channels);
        let (state_tx, state_rx) = create_state_channel();

        let mut task =
            SessionResolverTask::new(auth, profiles, guest_store, command_rx, state_tx);
        let join = tokio::spawn(async move { task.run().await });

        info!("session runtime started");
        Ok(Self {
            handle: SessionHandle::new(command_tx, state_rx),
            task: Some(join),
        })
    }

    /// A clone of the client handle
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Request shutdown and wait for the resolver task to finish
    pub async fn stop(mut self) -> VizdeckResult<()> {
        self.handle.shutdown().await?;
        if let Some(task) = self.task.take() {
            task.await
                .map_err(|err| VizdeckError::config_error(format!("resolver task panicked: {err}")))??;
        }
        info!("session runtime stopped");
        Ok(())
    }
}

impl Drop for SessionRuntime {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            warn!("session runtime dropped without stop(), aborting resolver task");
            task.abort();
        }
    }
}
