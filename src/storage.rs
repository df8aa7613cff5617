use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Key-value persistence for whole-state snapshots. Each `save` replaces the
/// previous value of the key.
pub trait BlobStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, BlobStoreError>;
    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), BlobStoreError>;
}

// ---------------- Filesystem implementation: one `<key>.json` file per key ----------------
pub struct FsBlobStore {
    dir: PathBuf,
}

impl FsBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl BlobStore for FsBlobStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, BlobStoreError> {
        match std::fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), BlobStoreError> {
        std::fs::create_dir_all(&self.dir)?;
        // write-then-rename so a crash never leaves a truncated snapshot
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

// ---------------- Process-memory implementation (tests, ephemeral runs) ----------------
#[derive(Default, Clone)]
pub struct MemoryBlobStore {
    inner: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, BlobStoreError> {
        let m = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(m.get(key).cloned())
    }

    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), BlobStoreError> {
        let mut m = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        m.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

// Factory helper used in main
pub fn build_blob_store(data_dir: &Path) -> Arc<dyn BlobStore> {
    info!(dir = %data_dir.display(), "using filesystem snapshot store");
    Arc::new(FsBlobStore::new(data_dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_store_round_trips_and_reports_missing_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(tmp.path().join("nested"));
        assert!(store.load("K").unwrap().is_none());
        store.save("K", b"{\"a\":1}").unwrap();
        store.save("K", b"{\"a\":2}").unwrap();
        assert_eq!(store.load("K").unwrap().unwrap(), b"{\"a\":2}");
        assert!(store.dir().join("K.json").exists());
    }

    #[test]
    fn memory_store_clones_share_contents() {
        let a = MemoryBlobStore::new();
        let b = a.clone();
        a.save("K", b"x").unwrap();
        assert_eq!(b.load("K").unwrap().unwrap(), b"x");
    }
}
