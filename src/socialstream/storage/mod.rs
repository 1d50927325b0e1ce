//! Partitioned durable storage
//!
//! - [`ObjectStore`]: the backend seam (existence check, idempotent directory
//!   creation, all-or-nothing object write, listing)
//! - [`FsObjectStore`]: local-filesystem implementation over `tokio::fs`
//! - [`PartitionedWriter`]: groups validated records by hourly partition key
//!   and performs one idempotent bulk write per partition, each through its
//!   own resiliently-acquired connection
//! - [`WriteReport`]: per-partition outcomes; one partition's failure never
//!   aborts its siblings

pub mod object_store;
pub mod writer;

pub use object_store::{FsObjectStore, FsStorageBackend, ObjectEntry, ObjectStore, StorageBackend};
pub use writer::{PartitionWrite, PartitionedWriter, WriteReport};

use super::connect::ConnectError;
use super::model::ValidationError;

/// Storage-layer failure for one path or one partition write.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O failure at '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode record batch: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl StorageError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this failure came from the caller's cancellation signal.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StorageError::Connect(ConnectError::Cancelled { .. }))
    }
}
