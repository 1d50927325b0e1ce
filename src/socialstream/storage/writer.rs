//! Partitioned batch writer.
//!
//! One `write` call validates the records, groups them by hourly partition
//! key, and performs one bulk JSON-lines write per partition. Partition
//! writes are isolated: a failure is recorded in the [`WriteReport`] and the
//! remaining partitions are still attempted. Each invocation targets a fresh
//! timestamped object name, so re-running the same records is additive and
//! never silently overwrites an earlier batch.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;

use super::super::connect::{BackendTarget, ResilientConnector};
use super::super::model::{Timestamped, Validate, ValidationError};
use super::super::partition::{partition_by_hour, PartitionKey};
use super::{ObjectStore, StorageBackend, StorageError};

/// Outcome of one partition's bulk write.
#[derive(Debug)]
pub struct PartitionWrite {
    pub key: PartitionKey,
    /// Store path of the written object (the intended path on failure).
    pub path: String,
    pub record_count: usize,
    pub outcome: Result<(), StorageError>,
}

impl PartitionWrite {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Per-partition results of one multi-partition write.
///
/// Partial failure is data, not an exception: callers inspect `failed()` and
/// decide whether to retry only those partitions.
#[derive(Debug, Default)]
pub struct WriteReport {
    pub entries: Vec<PartitionWrite>,
}

impl WriteReport {
    pub fn all_succeeded(&self) -> bool {
        self.entries.iter().all(PartitionWrite::succeeded)
    }

    pub fn succeeded(&self) -> Vec<&PartitionWrite> {
        self.entries.iter().filter(|e| e.succeeded()).collect()
    }

    pub fn failed(&self) -> Vec<&PartitionWrite> {
        self.entries.iter().filter(|e| !e.succeeded()).collect()
    }

    pub fn partition_count(&self) -> usize {
        self.entries.len()
    }

    /// Records that actually landed in the store.
    pub fn total_records_written(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.succeeded())
            .map(|e| e.record_count)
            .sum()
    }
}

/// Writes record batches to a partitioned store, one connection per
/// partition, acquired through the resilient connector.
pub struct PartitionedWriter {
    backend: Arc<dyn StorageBackend>,
    connector: ResilientConnector,
    target: BackendTarget,
    max_concurrent_partitions: usize,
}

impl PartitionedWriter {
    /// Sequential writer (concurrency 1), which bounds backend load while
    /// the store is still warming up.
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        target: BackendTarget,
        connector: ResilientConnector,
    ) -> Self {
        Self {
            backend,
            connector,
            target,
            max_concurrent_partitions: 1,
        }
    }

    /// Allow up to `limit` independent partition writes in flight.
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrent_partitions = limit.max(1);
        self
    }

    /// Write `records` under `<base_path>/<kind>/year=Y/month=MM/day=DD/hour=HH/`.
    ///
    /// Validation failures surface before anything touches the store. The
    /// returned report has exactly one entry per distinct partition key.
    pub async fn write<T>(
        &self,
        kind: &str,
        records: Vec<T>,
        base_path: &str,
    ) -> Result<WriteReport, ValidationError>
    where
        T: Timestamped + Validate + Serialize,
    {
        for record in &records {
            record.validate_or_err()?;
        }

        let batches = partition_by_hour(records);
        info!(
            "writing {} '{}' partitions under {}",
            batches.len(),
            kind,
            base_path
        );

        let entries: Vec<PartitionWrite> = stream::iter(
            batches
                .into_iter()
                .map(|(key, batch)| self.write_partition(kind, key, batch, base_path)),
        )
        .buffer_unordered(self.max_concurrent_partitions)
        .collect()
        .await;

        let mut report = WriteReport { entries };
        report.entries.sort_by_key(|e| e.key);

        for failure in report.failed() {
            warn!(
                "partition {} ({} records) failed: {}",
                failure.key,
                failure.record_count,
                failure
                    .outcome
                    .as_ref()
                    .err()
                    .map(|e| e.to_string())
                    .unwrap_or_default()
            );
        }
        Ok(report)
    }

    /// Serialize `records` as JSON lines and write them to one explicit
    /// path, unpartitioned. Used for record kinds without an event time.
    pub async fn write_json_lines<T>(
        &self,
        records: &[T],
        path: &str,
    ) -> Result<usize, StorageError>
    where
        T: Validate + Serialize,
    {
        for record in records {
            record.validate_or_err()?;
        }
        let bytes = encode_json_lines(records)?;
        let store = self.connect().await?;
        if let Some((dir, _)) = path.rsplit_once('/') {
            store.mkdir_all(dir).await?;
        }
        store.put_atomic(path, &bytes).await?;
        info!("wrote {} records to {}", records.len(), path);
        Ok(records.len())
    }

    /// Create the base path if missing. Idempotent; used before table DDL
    /// points a query backend at the location.
    pub async fn ensure_base_path(&self, base_path: &str) -> Result<(), StorageError> {
        let store = self.connect().await?;
        store.mkdir_all(base_path).await
    }

    /// List the contents of a path in the store (name and size).
    pub async fn list(&self, path: &str) -> Result<Vec<super::ObjectEntry>, StorageError> {
        let store = self.connect().await?;
        store.list(path).await
    }

    async fn connect(&self) -> Result<Arc<dyn ObjectStore>, StorageError> {
        let store = self
            .connector
            .connect(&self.target, || self.backend.dial())
            .await?;
        Ok(store)
    }

    async fn write_partition<T>(
        &self,
        kind: &str,
        key: PartitionKey,
        batch: Vec<T>,
        base_path: &str,
    ) -> PartitionWrite
    where
        T: Serialize,
    {
        let record_count = batch.len();
        let dir = format!(
            "{}/{}/{}",
            base_path.trim_end_matches('/'),
            kind,
            key.as_path_segment()
        );
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let path = format!("{}/{}_{}.json", dir, kind, stamp);

        let outcome = self
            .write_batch_to(&dir, &path, kind, &stamp.to_string(), &batch)
            .await;
        let path = match &outcome {
            Ok(final_path) => final_path.clone(),
            Err(_) => path,
        };

        if outcome.is_ok() {
            info!("wrote {} records to partition {}", record_count, key);
        }
        PartitionWrite {
            key,
            path,
            record_count,
            outcome: outcome.map(|_| ()),
        }
    }

    async fn write_batch_to<T>(
        &self,
        dir: &str,
        path: &str,
        kind: &str,
        stamp: &str,
        batch: &[T],
    ) -> Result<String, StorageError>
    where
        T: Serialize,
    {
        let bytes = encode_json_lines(batch)?;
        let store = self.connect().await?;
        // Creating an already-existing partition directory is a no-op.
        store.mkdir_all(dir).await?;

        // Repeat invocations in the same second would collide on the
        // convention name; suffix an index instead of truncating the
        // earlier object.
        let mut final_path = path.to_string();
        let mut index = 0u32;
        while store.exists(&final_path).await? {
            index += 1;
            final_path = format!("{}/{}_{}_{:04}.json", dir, kind, stamp, index);
        }

        store.put_atomic(&final_path, &bytes).await?;
        Ok(final_path)
    }
}

/// One JSON object per line, UTF-8, newline-terminated.
pub fn encode_json_lines<T: Serialize>(records: &[T]) -> Result<Vec<u8>, StorageError> {
    let mut bytes = Vec::new();
    for record in records {
        serde_json::to_writer(&mut bytes, record)?;
        bytes.push(b'\n');
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Row {
        id: u32,
    }

    #[test]
    fn test_encode_json_lines_newline_terminated() {
        let bytes = encode_json_lines(&[Row { id: 1 }, Row { id: 2 }]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "{\"id\":1}\n{\"id\":2}\n");
    }

    #[test]
    fn test_encode_empty_batch_is_empty() {
        let bytes = encode_json_lines::<Row>(&[]).unwrap();
        assert!(bytes.is_empty());
    }
}
