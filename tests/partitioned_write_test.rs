//! End-to-end partitioned write against a real (temporary) filesystem store.

use std::sync::Arc;

use socialstream::socialstream::connect::{BackendClass, BackendTarget, ResilientConnector};
use socialstream::socialstream::model::{Category, Tweet};
use socialstream::socialstream::storage::{FsStorageBackend, PartitionedWriter};

// 2024-08-01T13:00:00Z
const HOUR_ONE: i64 = 1_722_517_200;
// 2024-08-01T14:00:00Z
const HOUR_TWO: i64 = HOUR_ONE + 3600;

fn tweet(id: u32, timestamp: i64) -> Tweet {
    Tweet {
        tweet_id: format!("tweet_{:08}", id),
        user_id: format!("user_{:08}", id),
        username: format!("testuser{}", id),
        content: format!("Sample tweet content {}", id),
        timestamp,
        hashtags: vec![format!("#hashtag{}", id)],
        mentions: vec![],
        retweet_count: 0,
        like_count: i64::from(id),
        reply_count: 0,
        is_celebrity: false,
        celebrity_category: Category::Other,
    }
}

fn writer_for(root: &std::path::Path) -> PartitionedWriter {
    PartitionedWriter::new(
        Arc::new(FsStorageBackend::new(root)),
        BackendTarget::storage("object-store", format!("file://{}", root.display())),
        ResilientConnector::for_class(BackendClass::Storage),
    )
}

#[tokio::test]
async fn test_five_records_two_hours_two_partitions() {
    let dir = tempfile::tempdir().unwrap();
    let writer = writer_for(dir.path());

    let records = vec![
        tweet(1, HOUR_ONE + 10),
        tweet(2, HOUR_TWO + 20),
        tweet(3, HOUR_ONE + 30),
        tweet(4, HOUR_TWO + 40),
        tweet(5, HOUR_ONE + 50),
    ];

    let report = writer.write("tweets", records, "social_media").await.unwrap();
    assert!(report.all_succeeded());
    assert_eq!(report.partition_count(), 2);
    assert_eq!(report.total_records_written(), 5);

    // Exactly two partition directories under the kind root.
    let hour_dirs = [
        dir.path()
            .join("social_media/tweets/year=2024/month=08/day=01/hour=13"),
        dir.path()
            .join("social_media/tweets/year=2024/month=08/day=01/hour=14"),
    ];
    for hour_dir in &hour_dirs {
        assert!(hour_dir.is_dir(), "missing {}", hour_dir.display());
    }
    let day_dir = dir.path().join("social_media/tweets/year=2024/month=08/day=01");
    assert_eq!(std::fs::read_dir(&day_dir).unwrap().count(), 2);

    // One written file per partition, line count matching the batch size.
    let expected_lines = [3usize, 2usize];
    for (hour_dir, expected) in hour_dirs.iter().zip(expected_lines) {
        let files: Vec<_> = std::fs::read_dir(hour_dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1, "expected one file in {}", hour_dir.display());
        let contents = std::fs::read_to_string(&files[0]).unwrap();
        assert_eq!(contents.lines().count(), expected);
        assert!(contents.ends_with('\n'));
        // Every line is a standalone JSON object.
        for line in contents.lines() {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(value.get("tweet_id").is_some());
        }
    }
}

#[tokio::test]
async fn test_rerun_is_additive_not_overwriting() {
    let dir = tempfile::tempdir().unwrap();
    let writer = writer_for(dir.path());

    let records = || vec![tweet(1, HOUR_ONE + 5), tweet(2, HOUR_ONE + 6)];

    let first = writer.write("tweets", records(), "base").await.unwrap();
    let second = writer.write("tweets", records(), "base").await.unwrap();
    assert!(first.all_succeeded() && second.all_succeeded());

    let hour_dir = dir
        .path()
        .join("base/tweets/year=2024/month=08/day=01/hour=13");
    let files: Vec<_> = std::fs::read_dir(&hour_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(files.len(), 2, "repeat write must add a fresh object");
    for file in &files {
        let contents = std::fs::read_to_string(file).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}

#[tokio::test]
async fn test_invalid_record_rejected_before_store_is_touched() {
    let dir = tempfile::tempdir().unwrap();
    let writer = writer_for(dir.path());

    let mut bad = tweet(1, HOUR_ONE);
    bad.timestamp = 0;

    let result = writer.write("tweets", vec![bad], "base").await;
    let err = result.unwrap_err();
    assert_eq!(err.entity, "tweet");
    assert!(!dir.path().join("base").exists());
}

#[tokio::test]
async fn test_empty_input_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let writer = writer_for(dir.path());

    let report = writer
        .write("tweets", Vec::<Tweet>::new(), "base")
        .await
        .unwrap();
    assert_eq!(report.partition_count(), 0);
    assert_eq!(report.total_records_written(), 0);
    assert!(report.all_succeeded());
}

#[tokio::test]
async fn test_listing_shows_partition_layout() {
    let dir = tempfile::tempdir().unwrap();
    let writer = writer_for(dir.path());

    writer
        .write("tweets", vec![tweet(7, HOUR_ONE)], "base")
        .await
        .unwrap();

    let entries = writer
        .list("base/tweets/year=2024/month=08/day=01/hour=13")
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].name.starts_with("tweets_"));
    assert!(entries[0].name.ends_with(".json"));
    assert!(entries[0].size > 0);
}
