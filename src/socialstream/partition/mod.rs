//! Time partitioning: timestamp -> (year, month, day, hour) key and
//! single-pass batch grouping.
//!
//! The key doubles as a storage path segment (`year=Y/month=MM/day=DD/hour=HH`)
//! and as the table partition-column tuple. Derivation is pure and always in
//! UTC, so equal timestamps (to the hour) map to equal keys on every host.

use chrono::{DateTime, Datelike, Timelike};
use std::collections::BTreeMap;
use std::fmt;

use super::model::Timestamped;

/// Partition coordinates derived from an event timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionKey {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
}

impl PartitionKey {
    /// Derive the key from seconds since epoch, interpreted in UTC.
    ///
    /// Pure and total for every timestamp that passes record validation;
    /// callers guarantee a validated positive input (record invariant), so
    /// out-of-range values are not handled beyond clamping to the epoch.
    pub fn from_timestamp(timestamp: i64) -> PartitionKey {
        let datetime = DateTime::from_timestamp(timestamp, 0).unwrap_or_default();
        PartitionKey {
            year: datetime.year(),
            month: datetime.month(),
            day: datetime.day(),
            hour: datetime.hour(),
        }
    }

    /// Hive-style path segment, e.g. `year=2024/month=08/day=01/hour=13`.
    pub fn as_path_segment(&self) -> String {
        format!(
            "year={}/month={:02}/day={:02}/hour={:02}",
            self.year, self.month, self.day, self.hour
        )
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{:02}-{:02}T{:02}",
            self.year, self.month, self.day, self.hour
        )
    }
}

/// Group records by their hourly partition key in a single pass.
///
/// Input order is preserved within each batch; the `BTreeMap` makes the
/// grouping iterate in key order on every traversal. The sum of batch sizes
/// always equals the input length, and an empty input yields an empty map.
pub fn partition_by_hour<T: Timestamped>(records: Vec<T>) -> BTreeMap<PartitionKey, Vec<T>> {
    let mut batches: BTreeMap<PartitionKey, Vec<T>> = BTreeMap::new();
    for record in records {
        batches
            .entry(PartitionKey::from_timestamp(record.event_timestamp()))
            .or_default()
            .push(record);
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stamped(i64);

    impl Timestamped for Stamped {
        fn event_timestamp(&self) -> i64 {
            self.0
        }
    }

    // 2024-08-01T13:00:00Z
    const HOUR_START: i64 = 1_722_517_200;

    #[test]
    fn test_same_hour_same_key() {
        let a = PartitionKey::from_timestamp(HOUR_START);
        let b = PartitionKey::from_timestamp(HOUR_START + 3599);
        assert_eq!(a, b);
    }

    #[test]
    fn test_adjacent_hours_differ() {
        let a = PartitionKey::from_timestamp(HOUR_START);
        let b = PartitionKey::from_timestamp(HOUR_START + 3600);
        assert_ne!(a, b);
        assert_eq!(b.hour, a.hour + 1);
    }

    #[test]
    fn test_utc_components() {
        let key = PartitionKey::from_timestamp(HOUR_START);
        assert_eq!(
            key,
            PartitionKey {
                year: 2024,
                month: 8,
                day: 1,
                hour: 13
            }
        );
        assert_eq!(key.as_path_segment(), "year=2024/month=08/day=01/hour=13");
    }

    #[test]
    fn test_partition_preserves_order_and_counts() {
        let records = vec![
            Stamped(HOUR_START + 10),
            Stamped(HOUR_START + 3600),
            Stamped(HOUR_START + 20),
            Stamped(HOUR_START + 5),
        ];
        let batches = partition_by_hour(records);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches.values().map(Vec::len).sum::<usize>(), 4);

        let first = &batches[&PartitionKey::from_timestamp(HOUR_START)];
        let stamps: Vec<i64> = first.iter().map(|r| r.0).collect();
        assert_eq!(stamps, vec![HOUR_START + 10, HOUR_START + 20, HOUR_START + 5]);
    }

    #[test]
    fn test_partition_is_deterministic() {
        let make = || {
            (0..50)
                .map(|i| Stamped(HOUR_START + i * 600))
                .collect::<Vec<_>>()
        };
        let first = partition_by_hour(make());
        let second = partition_by_hour(make());
        let keys: Vec<_> = first.keys().copied().collect();
        assert_eq!(keys, second.keys().copied().collect::<Vec<_>>());
        for key in keys {
            assert_eq!(first[&key].len(), second[&key].len());
        }
    }

    #[test]
    fn test_empty_input_yields_empty_mapping() {
        let batches = partition_by_hour(Vec::<Stamped>::new());
        assert!(batches.is_empty());
    }
}
