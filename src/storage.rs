//! Durable key-value persistence
//!
//! Settings and the local lead pipeline store serialized records under fixed,
//! distinct keys. Reads and writes are synchronous; a write failure surfaces
//! as `SuiteError::Persistence` so the caller can leave memory untouched.

use crate::error::SuiteError;
use crate::Result;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Trait for the durable key-value medium
pub trait KeyValueStorage: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn store(&self, key: &str, value: &str) -> Result<()>;
}

/// File-backed storage: one JSON document per key under a data directory.
pub struct JsonFileStorage {
    dir: PathBuf,
}

impl JsonFileStorage {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            SuiteError::Persistence(format!("Failed to create data dir {}: {}", dir.display(), e))
        })?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStorage for JsonFileStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SuiteError::Persistence(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn store(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        fs::write(&path, value).map_err(|e| {
            SuiteError::Persistence(format!("Failed to write {}: {}", path.display(), e))
        })
    }
}

/// In-memory storage for tests and the offline demo.
pub struct InMemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Pre-seed a key, e.g. with corrupt data in tests.
    pub fn seed(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStorage for InMemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn store(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_round_trip() {
        let storage = InMemoryStorage::new();
        assert!(storage.load("rf_brands").unwrap().is_none());

        storage.store("rf_brands", "[]").unwrap();
        assert_eq!(storage.load("rf_brands").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = std::env::temp_dir().join(format!("suite-storage-{}", uuid::Uuid::new_v4()));
        let storage = JsonFileStorage::new(&dir).unwrap();

        assert!(storage.load("rf_profile").unwrap().is_none());
        storage.store("rf_profile", r#"{"name":"Test"}"#).unwrap();
        assert_eq!(
            storage.load("rf_profile").unwrap().as_deref(),
            Some(r#"{"name":"Test"}"#)
        );

        fs::remove_dir_all(&dir).ok();
    }
}
