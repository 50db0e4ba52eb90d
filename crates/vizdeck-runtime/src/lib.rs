//! Vizdeck Runtime
//!
//! Orchestration for identity resolution: a single resolver task owns the
//! current [`Identity`](vizdeck_core::Identity), serializing commands and
//! provider notifications through typed channels and publishing the resolved
//! state over a watch channel. Clients hold a cloneable [`SessionHandle`].

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod commands;
pub mod handle;
pub mod runtime;
pub mod session;
pub mod testing;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use commands::{
    create_command_channel, create_state_channel, CommandReceiver, CommandSender, SessionCommand,
    SessionState, StateReceiver, StateSender,
};
pub use handle::SessionHandle;
pub use runtime::SessionRuntime;
pub use session::SessionResolverTask;
pub use testing::{
    MemoryAuthProvider, MemoryCatalog, MemoryProfileRepository, MemorySettingRepository,
};
