//! In-memory collaborator implementations
//!
//! Deterministic stand-ins for the external authentication provider,
//! repositories, and catalog. Used by the integration tests and by the demo
//! shell; none of them touch the network or disk.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use vizdeck_core::{
    AuthError, AuthEventReceiver, AuthLifecycleEvent, AuthProvider, AuthSession,
    DataSourceKind, FederatedProvider, NewProfile, NewSetting, Profile, ProfileId,
    ProfileRepository, RepositoryError, SettingFilter, SettingId, SettingPatch, SettingRecord,
    SettingRepository, SubjectId, VisualizationCatalog, VisualizationType, VisualizationTypeId,
};

// ----------------------------------------------------------------------------
// Memory Auth Provider
// ----------------------------------------------------------------------------

struct UserRecord {
    password: String,
    session: AuthSession,
}

/// In-memory authentication provider with a fixed user table.
///
/// Lifecycle events fan out to every subscriber, mirroring a real provider's
/// notification bus. Redirect sign-in completes only when the test calls
/// [`MemoryAuthProvider::complete_redirect`].
pub struct MemoryAuthProvider {
    users: Mutex<HashMap<String, UserRecord>>,
    session: Mutex<Option<AuthSession>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<AuthLifecycleEvent>>>,
    fail_next_sign_out: AtomicBool,
}

impl MemoryAuthProvider {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            session: Mutex::new(None),
            subscribers: Mutex::new(Vec::new()),
            fail_next_sign_out: AtomicBool::new(false),
        }
    }

    /// Register a user that can sign in with the given password
    pub fn with_user(
        self,
        username: impl Into<String>,
        password: impl Into<String>,
        subject_id: impl Into<String>,
        email: Option<&str>,
    ) -> Self {
        let username = username.into();
        let record = UserRecord {
            password: password.into(),
            session: AuthSession {
                subject_id: SubjectId::new(subject_id),
                display_name: username.clone(),
                email: email.map(str::to_string),
            },
        };
        self.users.lock().unwrap().insert(username, record);
        self
    }

    /// Make the next `sign_out` call return a provider error
    pub fn fail_next_sign_out(&self) {
        self.fail_next_sign_out.store(true, Ordering::SeqCst);
    }

    /// Complete a pending federated redirect by installing a session and
    /// emitting `SignedIn`
    pub fn complete_redirect(&self, session: AuthSession) {
        *self.session.lock().unwrap() = Some(session);
        self.emit(AuthLifecycleEvent::SignedIn);
    }

    /// Fail a pending federated redirect by emitting `SignInFailed`
    pub fn fail_redirect(&self, reason: impl Into<String>) {
        self.emit(AuthLifecycleEvent::SignInFailed {
            reason: reason.into(),
        });
    }

    /// End the session out-of-band (token expiry, another tab) and emit
    /// `SignedOut`
    pub fn expire_session(&self) {
        *self.session.lock().unwrap() = None;
        self.emit(AuthLifecycleEvent::SignedOut);
    }

    fn emit(&self, event: AuthLifecycleEvent) {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl Default for MemoryAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthProvider for MemoryAuthProvider {
    async fn current_session(&self) -> Result<AuthSession, AuthError> {
        self.session
            .lock()
            .unwrap()
            .clone()
            .ok_or(AuthError::NoSession)
    }

    async fn sign_in(&self, username: &str, password: &str) -> Result<(), AuthError> {
        let session = {
            let users = self.users.lock().unwrap();
            let record = users.get(username).ok_or(AuthError::InvalidCredential)?;
            if record.password != password {
                return Err(AuthError::InvalidCredential);
            }
            record.session.clone()
        };
        *self.session.lock().unwrap() = Some(session);
        self.emit(AuthLifecycleEvent::SignedIn);
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if self.fail_next_sign_out.swap(false, Ordering::SeqCst) {
            // Remote call failed; the remote session stays as-is
            return Err(AuthError::provider("NetworkError"));
        }
        *self.session.lock().unwrap() = None;
        self.emit(AuthLifecycleEvent::SignedOut);
        Ok(())
    }

    async fn sign_in_with_redirect(&self, _provider: FederatedProvider) -> Result<(), AuthError> {
        // Redirect leaves the process; the outcome arrives later via
        // complete_redirect or fail_redirect
        Ok(())
    }

    fn subscribe(&self) -> AuthEventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }
}

// ----------------------------------------------------------------------------
// Memory Profile Repository
// ----------------------------------------------------------------------------

/// In-memory profile repository with a create-call counter and an optional
/// simulated create race
pub struct MemoryProfileRepository {
    profiles: Mutex<HashMap<SubjectId, Profile>>,
    create_calls: AtomicUsize,
    conflict_once: AtomicBool,
    fail_creates: AtomicBool,
}

impl MemoryProfileRepository {
    pub fn new() -> Self {
        Self {
            profiles: Mutex::new(HashMap::new()),
            create_calls: AtomicUsize::new(0),
            conflict_once: AtomicBool::new(false),
            fail_creates: AtomicBool::new(false),
        }
    }

    /// Number of `create` calls observed, for asserting create-once behavior
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Make the next `create` fail with a conflict while still inserting the
    /// record, simulating a lost race whose winner's record is then visible
    pub fn conflict_once(&self) {
        self.conflict_once.store(true, Ordering::SeqCst);
    }

    /// Make every `create` fail without inserting, so the re-query after a
    /// failed create also finds nothing
    pub fn fail_creates(&self) {
        self.fail_creates.store(true, Ordering::SeqCst);
    }
}

impl Default for MemoryProfileRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileRepository for MemoryProfileRepository {
    async fn find_by_subject(
        &self,
        subject_id: &SubjectId,
    ) -> Result<Option<Profile>, RepositoryError> {
        Ok(self.profiles.lock().unwrap().get(subject_id).cloned())
    }

    async fn create(&self, profile: NewProfile) -> Result<Profile, RepositoryError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(RepositoryError::backend("create unavailable"));
        }

        let mut profiles = self.profiles.lock().unwrap();
        if profiles.contains_key(&profile.subject_id) {
            return Err(RepositoryError::conflict("profile already exists"));
        }

        let record = Profile {
            id: ProfileId::generate(),
            subject_id: profile.subject_id.clone(),
            display_name: profile.display_name,
            email: profile.email,
            first_name: None,
            last_name: None,
            timezone: None,
        };
        profiles.insert(profile.subject_id, record.clone());

        if self.conflict_once.swap(false, Ordering::SeqCst) {
            return Err(RepositoryError::conflict("concurrent create"));
        }
        Ok(record)
    }
}

// ----------------------------------------------------------------------------
// Memory Setting Repository
// ----------------------------------------------------------------------------

/// In-memory setting repository preserving insertion order
pub struct MemorySettingRepository {
    records: Mutex<Vec<SettingRecord>>,
}

impl MemorySettingRepository {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    /// Every stored record, for inspecting ownership tags directly
    pub fn all(&self) -> Vec<SettingRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl Default for MemorySettingRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SettingRepository for MemorySettingRepository {
    async fn list(&self, filter: &SettingFilter) -> Result<Vec<SettingRecord>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }

    async fn create(&self, setting: NewSetting) -> Result<SettingRecord, RepositoryError> {
        let record = SettingRecord {
            id: SettingId::generate(),
            owner: setting.owner,
            type_id: setting.type_id,
            name: setting.name,
            config: setting.config,
            is_default: setting.is_default,
            last_viewed: setting.last_viewed,
        };
        self.records.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        id: &SettingId,
        patch: SettingPatch,
    ) -> Result<SettingRecord, RepositoryError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|record| record.id == *id)
            .ok_or_else(|| RepositoryError::not_found(id.as_str()))?;
        patch.apply(record);
        Ok(record.clone())
    }

    async fn get(&self, id: &SettingId) -> Result<Option<SettingRecord>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|record| record.id == *id)
            .cloned())
    }
}

// ----------------------------------------------------------------------------
// Memory Catalog
// ----------------------------------------------------------------------------

/// In-memory read-only catalog of visualization types
pub struct MemoryCatalog {
    types: Vec<VisualizationType>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self { types: Vec::new() }
    }

    /// Add a type to the catalog
    pub fn with_type(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        data_source: DataSourceKind,
        default_config: impl Into<String>,
    ) -> Self {
        self.types.push(VisualizationType {
            id: VisualizationTypeId::new(id),
            name: name.into(),
            description: description.into(),
            data_source,
            data_source_config: "{}".to_string(),
            default_config: default_config.into(),
        });
        self
    }
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VisualizationCatalog for MemoryCatalog {
    async fn list(
        &self,
        name_contains: Option<&str>,
    ) -> Result<Vec<VisualizationType>, RepositoryError> {
        let needle = name_contains.map(str::to_lowercase);
        Ok(self
            .types
            .iter()
            .filter(|ty| match &needle {
                Some(needle) => ty.name.to_lowercase().contains(needle),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn get(
        &self,
        id: &VisualizationTypeId,
    ) -> Result<Option<VisualizationType>, RepositoryError> {
        Ok(self.types.iter().find(|ty| ty.id == *id).cloned())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_in_validates_credentials() {
        let provider = MemoryAuthProvider::new().with_user("ada", "pw", "u-42", None);

        assert_eq!(
            provider.sign_in("ada", "wrong").await,
            Err(AuthError::InvalidCredential)
        );
        assert_eq!(
            provider.current_session().await,
            Err(AuthError::NoSession)
        );

        provider.sign_in("ada", "pw").await.unwrap();
        let session = provider.current_session().await.unwrap();
        assert_eq!(session.subject_id, SubjectId::new("u-42"));
    }

    #[tokio::test]
    async fn test_events_fan_out_to_subscribers() {
        let provider = MemoryAuthProvider::new().with_user("ada", "pw", "u-42", None);
        let mut rx = provider.subscribe();

        provider.sign_in("ada", "pw").await.unwrap();
        assert_eq!(rx.recv().await, Some(AuthLifecycleEvent::SignedIn));

        provider.sign_out().await.unwrap();
        assert_eq!(rx.recv().await, Some(AuthLifecycleEvent::SignedOut));
    }

    #[tokio::test]
    async fn test_conflict_once_still_inserts() {
        let repo = MemoryProfileRepository::new();
        repo.conflict_once();

        let result = repo
            .create(NewProfile {
                subject_id: SubjectId::new("u-1"),
                display_name: "u".to_string(),
                email: String::new(),
            })
            .await;
        assert!(result.is_err());

        // The losing create's winner is visible on re-query
        let found = repo.find_by_subject(&SubjectId::new("u-1")).await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_catalog_name_filter_is_case_insensitive() {
        let catalog = MemoryCatalog::new()
            .with_type("sports", "Sports Scores", "", DataSourceKind::Api, "{}")
            .with_type("weather", "Weather Radar", "", DataSourceKind::WebSocket, "{}");

        let hits = catalog.list(Some("SPORTS")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, VisualizationTypeId::new("sports"));
    }
}
