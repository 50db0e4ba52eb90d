//! Saved visualization settings and ownership resolution
//!
//! A setting is a named, versioned configuration blob (opaque JSON) tagged
//! with exactly one ownership key: the creator's profile ref when
//! authenticated, or the device session token when a guest. The
//! [`OwnershipResolver`] derives read filters and write tags from the
//! current [`Identity`] and reconciles create-vs-update so each
//! (identity, type) pair keeps a single record.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::{RepositoryError, VizdeckError, VizdeckResult};
use crate::identity::{Identity, OwnershipKey};
use crate::types::{GuestToken, ProfileId, SettingId, Timestamp, VisualizationTypeId};

// ----------------------------------------------------------------------------
// Setting Records
// ----------------------------------------------------------------------------

/// A persisted per-identity visualization setting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingRecord {
    /// Repository-assigned record id
    pub id: SettingId,
    /// Exactly one ownership key, fixed at creation
    pub owner: OwnershipKey,
    /// The visualization type this setting configures
    pub type_id: VisualizationTypeId,
    /// User-chosen configuration name
    pub name: String,
    /// Configuration blob, opaque JSON
    pub config: String,
    /// Whether this is the identity's default setting for the type
    pub is_default: bool,
    /// Refreshed on every save
    pub last_viewed: Option<Timestamp>,
}

/// Fields for creating a setting record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSetting {
    pub owner: OwnershipKey,
    pub type_id: VisualizationTypeId,
    pub name: String,
    pub config: String,
    pub is_default: bool,
    pub last_viewed: Option<Timestamp>,
}

/// Partial update of a setting record.
///
/// The repository applies a patch wholly or not at all; a failed update
/// leaves the record untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingPatch {
    pub name: Option<String>,
    pub config: Option<String>,
    pub is_default: Option<bool>,
    pub last_viewed: Option<Timestamp>,
    /// Only set by the explicit claim operation; ownership is never changed
    /// as a side effect of a normal save
    pub owner: Option<OwnershipKey>,
}

impl SettingPatch {
    /// Apply this patch to a record in place
    pub fn apply(&self, record: &mut SettingRecord) {
        if let Some(name) = &self.name {
            record.name = name.clone();
        }
        if let Some(config) = &self.config {
            record.config = config.clone();
        }
        if let Some(is_default) = self.is_default {
            record.is_default = is_default;
        }
        if let Some(last_viewed) = self.last_viewed {
            record.last_viewed = Some(last_viewed);
        }
        if let Some(owner) = &self.owner {
            record.owner = owner.clone();
        }
    }
}

// ----------------------------------------------------------------------------
// Read Filter
// ----------------------------------------------------------------------------

/// Ownership-scoped query over setting records.
///
/// The owner predicate matches exactly one ownership key kind, so a guest
/// filter can never match profile-owned records and vice versa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingFilter {
    pub owner: OwnershipKey,
    /// Secondary key; `None` lists every record the owner holds
    pub type_id: Option<VisualizationTypeId>,
}

impl SettingFilter {
    /// Whether a record satisfies this filter
    pub fn matches(&self, record: &SettingRecord) -> bool {
        if record.owner != self.owner {
            return false;
        }
        match &self.type_id {
            Some(type_id) => record.type_id == *type_id,
            None => true,
        }
    }
}

// ----------------------------------------------------------------------------
// Repository Trait
// ----------------------------------------------------------------------------

/// External store of setting records. Errors are surfaced to callers
/// un-retried.
#[async_trait]
pub trait SettingRepository: Send + Sync {
    /// List records matching a filter
    async fn list(&self, filter: &SettingFilter) -> Result<Vec<SettingRecord>, RepositoryError>;

    /// Create a record, assigning it a fresh id
    async fn create(&self, setting: NewSetting) -> Result<SettingRecord, RepositoryError>;

    /// Apply a patch to an existing record
    async fn update(
        &self,
        id: &SettingId,
        patch: SettingPatch,
    ) -> Result<SettingRecord, RepositoryError>;

    /// Get a record by id
    async fn get(&self, id: &SettingId) -> Result<Option<SettingRecord>, RepositoryError>;
}

// ----------------------------------------------------------------------------
// Ownership Resolver
// ----------------------------------------------------------------------------

/// Decides which setting records an identity may read, write, or claim.
///
/// The resolver remembers which record id was loaded for each
/// (owner, type) pair, so a subsequent save updates that record instead of
/// creating a duplicate.
pub struct OwnershipResolver {
    repository: Arc<dyn SettingRepository>,
    loaded: HashMap<(OwnershipKey, VisualizationTypeId), SettingId>,
}

impl OwnershipResolver {
    /// Create a resolver over a setting repository
    pub fn new(repository: Arc<dyn SettingRepository>) -> Self {
        Self {
            repository,
            loaded: HashMap::new(),
        }
    }

    /// The read filter for an identity and visualization type.
    ///
    /// Fails with `UnboundProfile` for an authenticated identity whose
    /// profile was never resolved; such an identity cannot own settings.
    pub fn read_filter(
        &self,
        identity: &Identity,
        type_id: &VisualizationTypeId,
    ) -> VizdeckResult<SettingFilter> {
        let owner = identity
            .ownership_key()
            .ok_or(VizdeckError::UnboundProfile)?;
        Ok(SettingFilter {
            owner,
            type_id: Some(type_id.clone()),
        })
    }

    /// Load the identity's setting for a visualization type, if any.
    ///
    /// Remembers the record id so a later save updates in place.
    pub async fn load(
        &mut self,
        identity: &Identity,
        type_id: &VisualizationTypeId,
    ) -> VizdeckResult<Option<SettingRecord>> {
        let filter = self.read_filter(identity, type_id)?;
        let mut records = self.repository.list(&filter).await?;
        let record = if records.is_empty() {
            None
        } else {
            Some(records.swap_remove(0))
        };
        if let Some(record) = &record {
            self.loaded
                .insert((filter.owner, type_id.clone()), record.id.clone());
        }
        Ok(record)
    }

    /// Save the identity's setting for a visualization type.
    ///
    /// Tags exactly the ownership field matching the identity kind, updates
    /// the previously loaded record if one is known for this (owner, type)
    /// pair, and creates otherwise. The config blob must be valid JSON;
    /// repository errors are surfaced un-retried.
    pub async fn save(
        &mut self,
        identity: &Identity,
        type_id: &VisualizationTypeId,
        name: impl Into<String>,
        config: impl Into<String>,
    ) -> VizdeckResult<SettingRecord> {
        let owner = identity
            .ownership_key()
            .ok_or(VizdeckError::UnboundProfile)?;
        let name = name.into();
        let config = config.into();

        // The blob is opaque to the engine but the dashboard has to parse it
        // back; reject it before anything reaches the repository
        if let Err(err) = serde_json::from_str::<serde_json::Value>(&config) {
            return Err(VizdeckError::config_error(format!(
                "setting config is not valid JSON: {err}"
            )));
        }

        let now = Timestamp::now();

        let key = (owner.clone(), type_id.clone());
        let record = match self.loaded.get(&key) {
            Some(id) => {
                let patch = SettingPatch {
                    name: Some(name),
                    config: Some(config),
                    last_viewed: Some(now),
                    ..SettingPatch::default()
                };
                self.repository.update(id, patch).await?
            }
            None => {
                let record = self
                    .repository
                    .create(NewSetting {
                        owner,
                        type_id: type_id.clone(),
                        name,
                        config,
                        is_default: false,
                        last_viewed: Some(now),
                    })
                    .await?;
                self.loaded.insert(key, record.id.clone());
                record
            }
        };
        Ok(record)
    }

    /// Explicitly claim every device-owned record for an authenticated
    /// identity, re-tagging ownership to its profile ref.
    ///
    /// This is the only operation that changes a record's ownership key, and
    /// it never runs implicitly on sign-in. Returns the re-tagged records.
    pub async fn claim_device_records(
        &mut self,
        identity: &Identity,
        token: &GuestToken,
    ) -> VizdeckResult<Vec<SettingRecord>> {
        let profile_ref: &ProfileId = match identity {
            Identity::Authenticated {
                profile_ref: Some(profile_ref),
                ..
            } => profile_ref,
            _ => return Err(VizdeckError::UnboundProfile),
        };

        let filter = SettingFilter {
            owner: OwnershipKey::Device(token.clone()),
            type_id: None,
        };
        let records = self.repository.list(&filter).await?;

        let mut claimed = Vec::with_capacity(records.len());
        for record in records {
            let patch = SettingPatch {
                owner: Some(OwnershipKey::Profile(profile_ref.clone())),
                ..SettingPatch::default()
            };
            claimed.push(self.repository.update(&record.id, patch).await?);
        }

        // Loaded ids for the old device owner no longer resolve under the
        // new ownership key
        self.loaded
            .retain(|(owner, _), _| *owner != OwnershipKey::Device(token.clone()));

        Ok(claimed)
    }

    /// Forget remembered record ids (e.g. after the identity changes)
    pub fn reset(&mut self) {
        self.loaded.clear();
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
