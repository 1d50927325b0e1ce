//! Object-store seam and the local-filesystem implementation.

use async_trait::async_trait;
use log::debug;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

use super::StorageError;

/// One listed object: name and size in bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub name: String,
    pub size: u64,
}

/// Hierarchical key-partitioned store the writer targets.
///
/// Paths are `/`-separated keys relative to the store root. `mkdir_all` is
/// idempotent: creating an existing container is a no-op, and concurrent
/// creation races are tolerated. `put_atomic` lands either the whole object
/// or nothing, durably flushed before it returns.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn exists(&self, path: &str) -> Result<bool, StorageError>;

    async fn mkdir_all(&self, path: &str) -> Result<(), StorageError>;

    async fn put_atomic(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError>;

    async fn list(&self, path: &str) -> Result<Vec<ObjectEntry>, StorageError>;
}

/// Dials one connection to a store; called once per connect attempt.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn dial(&self) -> Result<Arc<dyn ObjectStore>, Box<dyn Error + Send + Sync>>;
}

/// Local-filesystem store rooted at a base directory.
///
/// Atomicity comes from writing to a temporary sibling, syncing it to disk,
/// then renaming over the final name; a crash mid-write leaves only the
/// temporary behind.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        Ok(tokio::fs::try_exists(self.resolve(path))
            .await
            .map_err(|e| StorageError::io(path, e))?)
    }

    async fn mkdir_all(&self, path: &str) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(self.resolve(path))
            .await
            .map_err(|e| StorageError::io(path, e))
    }

    async fn put_atomic(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let target = self.resolve(path);
        let tmp = target.with_extension("tmp");

        let mut file = tokio::fs::File::create(&tmp)
            .await
            .map_err(|e| StorageError::io(path, e))?;
        file.write_all(bytes)
            .await
            .map_err(|e| StorageError::io(path, e))?;
        file.flush().await.map_err(|e| StorageError::io(path, e))?;
        // Durable before the rename makes it visible.
        file.sync_all()
            .await
            .map_err(|e| StorageError::io(path, e))?;
        drop(file);

        tokio::fs::rename(&tmp, &target)
            .await
            .map_err(|e| StorageError::io(path, e))?;
        debug!("wrote {} bytes to {}", bytes.len(), target.display());
        Ok(())
    }

    async fn list(&self, path: &str) -> Result<Vec<ObjectEntry>, StorageError> {
        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(self.resolve(path))
            .await
            .map_err(|e| StorageError::io(path, e))?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| StorageError::io(path, e))?
        {
            let metadata = entry
                .metadata()
                .await
                .map_err(|e| StorageError::io(path, e))?;
            entries.push(ObjectEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                size: metadata.len(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

/// Backend that hands out a shared filesystem store.
pub struct FsStorageBackend {
    store: Arc<FsObjectStore>,
}

impl FsStorageBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            store: Arc::new(FsObjectStore::new(root)),
        }
    }
}

#[async_trait]
impl StorageBackend for FsStorageBackend {
    async fn dial(&self) -> Result<Arc<dyn ObjectStore>, Box<dyn Error + Send + Sync>> {
        Ok(self.store.clone())
    }
}
