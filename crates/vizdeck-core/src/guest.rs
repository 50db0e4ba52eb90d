//! Guest identity store
//!
//! Persists the stable anonymous token that identifies a device-bound guest.
//! The token is created lazily on first need and lives until the caller
//! explicitly clears it. Storage is abstracted behind [`DeviceStorage`] so
//! the same store works against a browser-profile-like slot, a file on disk,
//! or an in-memory map in tests.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::errors::StorageError;
use crate::types::GuestToken;

/// Storage slot the guest token is persisted under
pub const GUEST_TOKEN_KEY: &str = "guest-session-id";

// ----------------------------------------------------------------------------
// Storage Trait
// ----------------------------------------------------------------------------

/// Device-local persistent string key-value slot
pub trait DeviceStorage: Send + Sync {
    /// Read a value by key
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Persist a value under a key
    fn store(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value by key
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;

    /// Check if storage is available and accessible
    fn is_available(&self) -> bool;
}

// ----------------------------------------------------------------------------
// Memory Storage Implementation
// ----------------------------------------------------------------------------

/// In-memory storage implementation for testing and fallback
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: std::collections::BTreeMap<String, String>,
    available: bool,
    write_count: usize,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self {
            data: std::collections::BTreeMap::new(),
            available: true,
            write_count: 0,
        }
    }

    /// Create an instance that reports storage as unavailable
    pub fn unavailable() -> Self {
        Self {
            data: std::collections::BTreeMap::new(),
            available: false,
            write_count: 0,
        }
    }

    /// Number of successful writes (for asserting write-once behavior)
    pub fn write_count(&self) -> usize {
        self.write_count
    }
}

impl DeviceStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        if !self.available {
            return Err(StorageError::Unavailable);
        }
        Ok(self.data.get(key).cloned())
    }

    fn store(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if !self.available {
            return Err(StorageError::Unavailable);
        }
        self.data.insert(key.to_string(), value.to_string());
        self.write_count += 1;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if !self.available {
            return Err(StorageError::Unavailable);
        }
        self.data.remove(key);
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

// ----------------------------------------------------------------------------
// File Storage Implementation
// ----------------------------------------------------------------------------

/// File-backed storage: one file per key under a device-local directory
#[derive(Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Create a file storage rooted at the given directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    fn map_io_error(err: std::io::Error) -> StorageError {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => StorageError::AccessDenied,
            _ => StorageError::io(err.to_string()),
        }
    }
}

impl DeviceStorage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value.trim().to_string())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Self::map_io_error(err)),
        }
    }

    fn store(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir).map_err(Self::map_io_error)?;
        std::fs::write(self.path_for(key), value).map_err(Self::map_io_error)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Self::map_io_error(err)),
        }
    }

    fn is_available(&self) -> bool {
        self.dir.exists() || std::fs::create_dir_all(&self.dir).is_ok()
    }
}

/// Create the default file-backed storage under a data directory
pub fn create_file_storage(data_dir: &Path) -> Box<dyn DeviceStorage> {
    Box::new(FileStorage::new(data_dir))
}

/// Create a storage implementation for testing
pub fn create_test_storage() -> Box<dyn DeviceStorage> {
    Box::new(MemoryStorage::new())
}

// ----------------------------------------------------------------------------
// Guest Session
// ----------------------------------------------------------------------------

/// A resolved guest token and whether it survived to persistent storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestSession {
    /// The device session token
    pub token: GuestToken,
    /// False when the token only lives for this process (storage unavailable)
    pub persisted: bool,
}

// ----------------------------------------------------------------------------
// Guest Identity Store
// ----------------------------------------------------------------------------

/// Persists and retrieves the stable anonymous identifier for this device.
///
/// `get_or_create` is idempotent: repeated calls return the same token with
/// exactly one storage write on first creation. When storage fails the store
/// degrades to a per-process ephemeral token rather than failing identity
/// resolution; the ephemeral token stays stable for the process lifetime.
pub struct GuestIdentityStore {
    storage: Box<dyn DeviceStorage>,
    storage_key: String,
    ephemeral: Option<GuestToken>,
}

impl GuestIdentityStore {
    /// Create a store over the given storage backend
    pub fn new(storage: Box<dyn DeviceStorage>) -> Self {
        Self::with_key(storage, GUEST_TOKEN_KEY)
    }

    /// Create a store with a custom storage key
    pub fn with_key(storage: Box<dyn DeviceStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            storage_key: key.into(),
            ephemeral: None,
        }
    }

    /// Create a store for testing, backed by memory storage
    pub fn new_for_testing() -> Self {
        Self::new(create_test_storage())
    }

    /// Read the persisted token, creating and persisting one if absent
    pub fn get_or_create(&mut self) -> GuestSession {
        if let Some(token) = &self.ephemeral {
            return GuestSession {
                token: token.clone(),
                persisted: false,
            };
        }

        match self.storage.load(&self.storage_key) {
            Ok(Some(raw)) if !raw.is_empty() => GuestSession {
                token: GuestToken::new(raw),
                persisted: true,
            },
            Ok(_) => {
                let token = GuestToken::generate();
                match self.storage.store(&self.storage_key, token.as_str()) {
                    Ok(()) => GuestSession {
                        token,
                        persisted: true,
                    },
                    Err(err) => self.degrade_to_ephemeral(token, err),
                }
            }
            Err(err) => self.degrade_to_ephemeral(GuestToken::generate(), err),
        }
    }

    /// Explicitly clear the persisted token and any ephemeral fallback.
    ///
    /// The next `get_or_create` call mints a fresh token.
    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.ephemeral = None;
        self.storage.remove(&self.storage_key)
    }

    /// Whether the backing storage is currently usable
    pub fn is_storage_available(&self) -> bool {
        self.storage.is_available()
    }

    fn degrade_to_ephemeral(&mut self, token: GuestToken, err: StorageError) -> GuestSession {
        warn!(
            error = %err,
            "guest token storage unavailable; using ephemeral per-process token"
        );
        self.ephemeral = Some(token.clone());
        GuestSession {
            token,
            persisted: false,
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_is_idempotent() {
        let mut store = GuestIdentityStore::new_for_testing();

        let first = store.get_or_create();
        let second = store.get_or_create();
        assert_eq!(first, second);
        assert!(first.persisted);
    }

    #[test]
    fn test_single_storage_write() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        struct CountingStorage {
            inner: MemoryStorage,
            writes: Arc<AtomicUsize>,
        }

        impl DeviceStorage for CountingStorage {
            fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
                self.inner.load(key)
            }
            fn store(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
                self.writes.fetch_add(1, Ordering::SeqCst);
                self.inner.store(key, value)
            }
            fn remove(&mut self, key: &str) -> Result<(), StorageError> {
                self.inner.remove(key)
            }
            fn is_available(&self) -> bool {
                self.inner.is_available()
            }
        }

        let writes = Arc::new(AtomicUsize::new(0));
        let mut store = GuestIdentityStore::new(Box::new(CountingStorage {
            inner: MemoryStorage::new(),
            writes: writes.clone(),
        }));

        let first = store.get_or_create();
        let second = store.get_or_create();
        assert_eq!(first, second);
        assert_eq!(writes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unavailable_storage_degrades_to_ephemeral() {
        let mut store = GuestIdentityStore::new(Box::new(MemoryStorage::unavailable()));

        let first = store.get_or_create();
        assert!(!first.persisted);

        // Ephemeral token stays stable within the process
        let second = store.get_or_create();
        assert_eq!(first.token, second.token);
    }

    #[test]
    fn test_clear_mints_fresh_token() {
        let mut store = GuestIdentityStore::new_for_testing();

        let first = store.get_or_create();
        store.clear().unwrap();
        let second = store.get_or_create();
        assert_ne!(first.token, second.token);
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path().join("vizdeck"));

        assert_eq!(storage.load(GUEST_TOKEN_KEY).unwrap(), None);
        storage.store(GUEST_TOKEN_KEY, "tok-1").unwrap();
        assert_eq!(
            storage.load(GUEST_TOKEN_KEY).unwrap(),
            Some("tok-1".to_string())
        );
        storage.remove(GUEST_TOKEN_KEY).unwrap();
        assert_eq!(storage.load(GUEST_TOKEN_KEY).unwrap(), None);
    }
}
