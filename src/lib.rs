//! # socialstream
//!
//! Synthetic social-network activity pipeline: generates users, tweets and
//! engagement events, partitions them by event time, durably writes
//! JSON-lines batches to a key-partitioned store, and synthesizes
//! parameterized analytical queries (top-K, grouped aggregation, array
//! fan-out) against the partitioned dataset.
//!
//! ## Architecture
//!
//! - **generator**: synthetic records with internally consistent cross-field
//!   relationships (celebrity threshold drives engagement scaling)
//! - **partition**: deterministic UTC (year, month, day, hour) keys and
//!   single-pass batch grouping
//! - **connect**: bounded retry with backoff against slow-starting backends,
//!   interruptible waits, and a process-wide startup latch
//! - **storage**: per-partition idempotent bulk writes with isolated
//!   failures reported in a [`storage::WriteReport`]
//! - **query**: declarative [`query::QuerySpec`] to parameterized SQL; scalar
//!   values are always bound, never interpolated
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use socialstream::socialstream::connect::{BackendTarget, ResilientConnector, BackendClass};
//! use socialstream::socialstream::generator::DataGenerator;
//! use socialstream::socialstream::storage::{FsStorageBackend, PartitionedWriter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut generator = DataGenerator::new(None);
//!     let tweets = generator.generate_tweets(100);
//!
//!     let backend = Arc::new(FsStorageBackend::new("/data"));
//!     let target = BackendTarget::storage("object-store", "file:///data");
//!     let writer = PartitionedWriter::new(
//!         backend,
//!         target,
//!         ResilientConnector::for_class(BackendClass::Storage),
//!     );
//!
//!     let report = writer.write("tweets", tweets, "/data/social_media").await?;
//!     println!(
//!         "{} partitions, {} records written",
//!         report.partition_count(),
//!         report.total_records_written()
//!     );
//!     Ok(())
//! }
//! ```

pub mod socialstream;

// Re-export the main API surface.
pub use socialstream::config::{ConfigError, PipelineConfig};
pub use socialstream::connect::{
    BackendClass, BackendTarget, ConnectError, ConnectState, ResilientConnector, RetryPolicy,
    StartupLatch,
};
pub use socialstream::generator::{DataGenerator, TimeRange};
pub use socialstream::model::{
    Category, Event, EventType, Timestamped, Tweet, User, Validate, ValidationError,
    CELEBRITY_THRESHOLD,
};
pub use socialstream::partition::{partition_by_hour, PartitionKey};
pub use socialstream::query::{
    AggFunc, CompareOp, OrderDirection, ParameterizedQuery, QueryError, QueryExecutor, QuerySpec,
    QuerySpecError, ResultRow, SqlValue, TableSchema,
};
pub use socialstream::storage::{
    FsObjectStore, FsStorageBackend, ObjectStore, PartitionedWriter, StorageError, WriteReport,
};
