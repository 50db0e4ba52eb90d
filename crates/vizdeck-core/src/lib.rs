//! Vizdeck Core
//!
//! Identity resolution and session-ownership primitives for the vizdeck
//! dashboard: the tagged [`Identity`] model, the device-bound guest store,
//! the contracts for the external authentication provider and repositories,
//! and the ownership resolver that scopes saved visualization settings to
//! exactly one owner.
//!
//! Orchestration (the session resolver task and its channels) lives in the
//! `vizdeck-runtime` crate.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod auth;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod guest;
pub mod identity;
pub mod profile;
pub mod settings;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use auth::{AuthEventReceiver, AuthLifecycleEvent, AuthProvider, AuthSession, FederatedProvider};
pub use catalog::{DataSourceKind, VisualizationCatalog, VisualizationType};
pub use config::{ChannelConfig, GuestStoreConfig, ResolverConfig};
pub use errors::{
    AuthError, ChannelError, RepositoryError, StorageError, VizdeckError, VizdeckResult,
};
pub use guest::{
    create_file_storage, create_test_storage, DeviceStorage, FileStorage, GuestIdentityStore,
    GuestSession, MemoryStorage,
};
pub use identity::{Identity, OwnershipKey, GUEST_DISPLAY_NAME};
pub use profile::{NewProfile, Profile, ProfileRepository};
pub use settings::{
    NewSetting, OwnershipResolver, SettingFilter, SettingPatch, SettingRecord, SettingRepository,
};
pub use types::{
    GuestToken, ProfileId, SettingId, SubjectId, Timestamp, VisualizationTypeId,
};
