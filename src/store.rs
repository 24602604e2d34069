use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::StoreError;

/// Namespace of the credential record in the default cache directory
pub const DEFAULT_NAMESPACE: &str = "innertube_credential";

/// The persisted `(secret, timestamp)` pair, always written as one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
    pub secret: String,
    /// Unix epoch milliseconds
    pub issued_at_ms: u64,
}

/// Durable key-value slot holding at most one credential record
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<StoredCredential>, StoreError>;

    fn save(&self, record: &StoredCredential) -> Result<(), StoreError>;

    /// Removing an absent record is not an error
    fn remove(&self) -> Result<(), StoreError>;
}

/// JSON file store; survives process restarts.
///
/// Writes go to a uniquely named sibling temp file that is then renamed over
/// the target, so concurrent writers never clobber each other and a reader in
/// another process sees the old record or the new one.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<cache dir>/ytsub/<namespace>.json`
    pub fn in_cache_dir(namespace: &str) -> Result<Self, StoreError> {
        let dir = dirs::cache_dir().ok_or(StoreError::NoCacheDir)?;
        Ok(Self::new(dir.join("ytsub").join(format!("{namespace}.json"))))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl CredentialStore for FileStore {
    fn load(&self) -> Result<Option<StoredCredential>, StoreError> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record: StoredCredential = serde_json::from_str(&data)?;
        debug!("Loaded credential record: {}", self.path.display());
        Ok(Some(record))
    }

    fn save(&self, record: &StoredCredential) -> Result<(), StoreError> {
        let dir = self.dir();
        std::fs::create_dir_all(dir)?;
        let data = serde_json::to_vec(record)?;

        // Each writer gets its own temp file; the rename is the commit point
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        debug!("Saved credential record: {}", self.path.display());
        Ok(())
    }

    fn remove(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStore {
    record: Mutex<Option<StoredCredential>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: StoredCredential) -> Self {
        Self {
            record: Mutex::new(Some(record)),
        }
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self) -> Result<Option<StoredCredential>, StoreError> {
        Ok(self.record.lock().clone())
    }

    fn save(&self, record: &StoredCredential) -> Result<(), StoreError> {
        *self.record.lock() = Some(record.clone());
        Ok(())
    }

    fn remove(&self) -> Result<(), StoreError> {
        *self.record.lock() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::tempdir;

    fn record(secret: &str) -> StoredCredential {
        StoredCredential {
            secret: secret.to_string(),
            issued_at_ms: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_file_store_missing_is_none() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("cred.json"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("cred.json");

        FileStore::new(&path).save(&record("AIzaSyTest")).unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.load().unwrap(), Some(record("AIzaSyTest")));

        let leftovers = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_file_store_concurrent_writers_on_one_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cred.json");

        let handles: Vec<_> = (0..4)
            .map(|w| {
                let store = FileStore::new(&path);
                thread::spawn(move || {
                    for i in 0..250 {
                        store.save(&record(&format!("writer-{w}-{i}"))).unwrap();
                        let loaded = store.load().unwrap().expect("a record is always present");
                        assert!(loaded.secret.starts_with("writer-"));
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        let last = FileStore::new(&path).load().unwrap().unwrap();
        assert!(last.secret.ends_with("-249"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_file_store_remove_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("cred.json"));
        store.save(&record("k")).unwrap();
        store.remove().unwrap();
        store.remove().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_file_store_corrupt_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cred.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = FileStore::new(&path);
        assert!(matches!(store.load(), Err(StoreError::Serialize(_))));
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.load().unwrap(), None);
        store.save(&record("k1")).unwrap();
        store.save(&record("k2")).unwrap();
        assert_eq!(store.load().unwrap(), Some(record("k2")));
        store.remove().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }
}
