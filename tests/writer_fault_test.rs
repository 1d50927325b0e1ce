//! Partition-failure isolation and cancellation reporting in the writer.

use std::sync::Arc;
use std::time::Duration;

use socialstream::socialstream::connect::{
    BackendTarget, ResilientConnector, RetryPolicy,
};
use socialstream::socialstream::model::{Category, Tweet};
use socialstream::socialstream::storage::{
    FsObjectStore, PartitionedWriter, StorageBackend,
};
use socialstream::socialstream::test_harness::{FixedStoreBackend, PartitionFaultStore};
use tokio_util::sync::CancellationToken;

// 2024-08-01T13:00:00Z
const HOUR_ONE: i64 = 1_722_517_200;
const HOUR_TWO: i64 = HOUR_ONE + 3600;

fn tweet(id: u32, timestamp: i64) -> Tweet {
    Tweet {
        tweet_id: format!("tweet_{:08}", id),
        user_id: format!("user_{:08}", id),
        username: format!("testuser{}", id),
        content: format!("Sample tweet content {}", id),
        timestamp,
        hashtags: vec![],
        mentions: vec![],
        retweet_count: 0,
        like_count: 0,
        reply_count: 0,
        is_celebrity: false,
        celebrity_category: Category::Other,
    }
}

#[tokio::test]
async fn test_one_failed_partition_does_not_abort_siblings() {
    let dir = tempfile::tempdir().unwrap();
    // hour=14 writes fail; hour=13 writes pass through to disk.
    let store = PartitionFaultStore::new(
        Arc::new(FsObjectStore::new(dir.path())),
        "hour=14",
    );
    let writer = PartitionedWriter::new(
        Arc::new(FixedStoreBackend::new(Arc::new(store))),
        BackendTarget::storage("object-store", "file://faulty"),
        ResilientConnector::new(RetryPolicy::new(1, Duration::from_millis(1))),
    );

    let report = writer
        .write(
            "tweets",
            vec![tweet(1, HOUR_ONE), tweet(2, HOUR_TWO), tweet(3, HOUR_ONE)],
            "base",
        )
        .await
        .unwrap();

    assert_eq!(report.partition_count(), 2);
    assert_eq!(report.succeeded().len(), 1);
    assert_eq!(report.failed().len(), 1);
    assert_eq!(report.total_records_written(), 2);

    let failed = report.failed()[0];
    assert_eq!(failed.key.hour, 14);
    assert_eq!(failed.record_count, 1);
    let detail = failed.outcome.as_ref().unwrap_err().to_string();
    assert!(detail.contains("injected partition fault"), "got: {}", detail);

    // The healthy partition's file landed.
    let healthy = dir
        .path()
        .join("base/tweets/year=2024/month=08/day=01/hour=13");
    assert_eq!(std::fs::read_dir(healthy).unwrap().count(), 1);
}

struct NeverDials;

#[async_trait::async_trait]
impl StorageBackend for NeverDials {
    async fn dial(
        &self,
    ) -> Result<
        Arc<dyn socialstream::socialstream::storage::ObjectStore>,
        Box<dyn std::error::Error + Send + Sync>,
    > {
        Err("store is down".into())
    }
}

#[tokio::test]
async fn test_exhausted_retries_surface_per_partition() {
    let writer = PartitionedWriter::new(
        Arc::new(NeverDials),
        BackendTarget::storage("object-store", "file://down"),
        ResilientConnector::new(RetryPolicy::new(2, Duration::from_millis(1))),
    );

    let report = writer
        .write("tweets", vec![tweet(1, HOUR_ONE)], "base")
        .await
        .unwrap();
    assert_eq!(report.failed().len(), 1);
    let detail = report.failed()[0].outcome.as_ref().unwrap_err().to_string();
    assert!(detail.contains("after 2 attempts"), "got: {}", detail);
    assert!(detail.contains("store is down"), "got: {}", detail);
}

#[tokio::test]
async fn test_cancellation_reported_as_cancelled_not_unavailable() {
    let cancel = CancellationToken::new();
    let writer = PartitionedWriter::new(
        Arc::new(NeverDials),
        BackendTarget::storage("object-store", "file://down"),
        ResilientConnector::new(RetryPolicy::new(5, Duration::from_secs(30)))
            .with_cancellation(cancel.clone()),
    );

    let canceller = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        }
    });

    let report = writer
        .write("tweets", vec![tweet(1, HOUR_ONE)], "base")
        .await
        .unwrap();
    canceller.await.unwrap();

    assert_eq!(report.failed().len(), 1);
    let failure = report.failed()[0].outcome.as_ref().unwrap_err();
    assert!(failure.is_cancelled(), "got: {}", failure);
}
