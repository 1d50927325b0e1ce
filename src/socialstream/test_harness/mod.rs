//! Reusable fakes for exercising the pipeline without live backends
//!
//! - [`FlakyDial`]: a dial function that fails a configured number of times
//!   while counting attempts, for the connector's retry properties
//! - [`RecordingSleeper`]: captures requested delays instead of sleeping
//! - [`FixedStoreBackend`] / [`PartitionFaultStore`]: object-store doubles,
//!   the latter failing writes whose path matches a marker
//! - [`MemoryQueryBackend`]: interprets a query's retained [`QuerySpec`]
//!   over fixture rows (filter, fan-out, group/aggregate, having, order,
//!   limit), so top-K and fan-out behavior is executable without a SQL
//!   engine

use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::connect::Sleeper;
use super::model::Tweet;
use super::partition::PartitionKey;
use super::query::{
    AggFunc, ParameterizedQuery, QueryBackend, QueryService, QuerySpec, ResultRow, SqlValue,
};
use super::storage::{ObjectEntry, ObjectStore, StorageBackend, StorageError};

/// Dial function that fails its first `k` calls, then succeeds forever.
pub struct FlakyDial {
    succeed_after: Option<u32>,
    attempts: AtomicU32,
}

impl FlakyDial {
    /// Every dial fails.
    pub fn never_succeeds() -> Self {
        Self {
            succeed_after: None,
            attempts: AtomicU32::new(0),
        }
    }

    /// Fail the first `failures` dials, succeed from then on.
    pub fn succeeds_after(failures: u32) -> Self {
        Self {
            succeed_after: Some(failures),
            attempts: AtomicU32::new(0),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(AtomicOrdering::SeqCst)
    }

    pub async fn dial(&self) -> Result<&'static str, Box<dyn Error + Send + Sync>> {
        let attempt = self.attempts.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        match self.succeed_after {
            Some(failures) if attempt > failures => Ok("connected"),
            _ => Err(format!("connection refused (attempt {})", attempt).into()),
        }
    }
}

/// Sleeper that records every requested delay and returns immediately.
#[derive(Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn recorded(&self) -> Vec<Duration> {
        match self.slept.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        match self.slept.lock() {
            Ok(mut guard) => guard.push(duration),
            Err(poisoned) => poisoned.into_inner().push(duration),
        }
        tokio::task::yield_now().await;
    }
}

/// Storage backend whose every dial hands out the same store.
pub struct FixedStoreBackend {
    store: Arc<dyn ObjectStore>,
}

impl FixedStoreBackend {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl StorageBackend for FixedStoreBackend {
    async fn dial(&self) -> Result<Arc<dyn ObjectStore>, Box<dyn Error + Send + Sync>> {
        Ok(self.store.clone())
    }
}

/// Decorator that fails `put_atomic` for any path containing the marker.
pub struct PartitionFaultStore {
    inner: Arc<dyn ObjectStore>,
    fail_marker: String,
}

impl PartitionFaultStore {
    pub fn new(inner: Arc<dyn ObjectStore>, fail_marker: impl Into<String>) -> Self {
        Self {
            inner,
            fail_marker: fail_marker.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for PartitionFaultStore {
    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        self.inner.exists(path).await
    }

    async fn mkdir_all(&self, path: &str) -> Result<(), StorageError> {
        self.inner.mkdir_all(path).await
    }

    async fn put_atomic(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        if path.contains(&self.fail_marker) {
            return Err(StorageError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::Other, "injected partition fault"),
            ));
        }
        self.inner.put_atomic(path, bytes).await
    }

    async fn list(&self, path: &str) -> Result<Vec<ObjectEntry>, StorageError> {
        self.inner.list(path).await
    }
}

/// Query service whose every dial hands out the same backend.
pub struct FixedQueryService {
    backend: Arc<dyn QueryBackend>,
}

impl FixedQueryService {
    pub fn new(backend: Arc<dyn QueryBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl QueryService for FixedQueryService {
    async fn dial(&self) -> Result<Arc<dyn QueryBackend>, Box<dyn Error + Send + Sync>> {
        Ok(self.backend.clone())
    }
}

/// In-memory query backend over fixture rows.
///
/// Interprets the [`QuerySpec`] retained by the built query instead of
/// parsing SQL; aggregation semantics (COUNT/AVG/MAX/MIN/STDDEV_POP) match
/// what the real backend computes.
pub struct MemoryQueryBackend {
    rows: Vec<ResultRow>,
}

impl MemoryQueryBackend {
    pub fn with_rows(rows: Vec<ResultRow>) -> Self {
        Self { rows }
    }

    /// Fixture rows shaped like the partitioned tweets table, partition
    /// columns included.
    pub fn from_tweets(tweets: &[Tweet]) -> Self {
        let rows = tweets
            .iter()
            .map(|t| {
                let key = PartitionKey::from_timestamp(t.timestamp);
                ResultRow::new(vec![
                    ("tweet_id".into(), SqlValue::Text(t.tweet_id.clone())),
                    ("user_id".into(), SqlValue::Text(t.user_id.clone())),
                    ("username".into(), SqlValue::Text(t.username.clone())),
                    ("content".into(), SqlValue::Text(t.content.clone())),
                    ("tweet_timestamp".into(), SqlValue::Integer(t.timestamp)),
                    ("like_count".into(), SqlValue::Integer(t.like_count)),
                    ("retweet_count".into(), SqlValue::Integer(t.retweet_count)),
                    ("reply_count".into(), SqlValue::Integer(t.reply_count)),
                    ("is_celebrity".into(), SqlValue::Bool(t.is_celebrity)),
                    (
                        "celebrity_category".into(),
                        SqlValue::Text(t.celebrity_category.to_string()),
                    ),
                    (
                        "hashtags".into(),
                        SqlValue::Array(
                            t.hashtags.iter().map(|h| SqlValue::Text(h.clone())).collect(),
                        ),
                    ),
                    (
                        "mentions".into(),
                        SqlValue::Array(
                            t.mentions.iter().map(|m| SqlValue::Text(m.clone())).collect(),
                        ),
                    ),
                    ("year".into(), SqlValue::Integer(key.year as i64)),
                    ("month".into(), SqlValue::Integer(key.month as i64)),
                    ("day".into(), SqlValue::Integer(key.day as i64)),
                    ("hour".into(), SqlValue::Integer(key.hour as i64)),
                ])
            })
            .collect();
        Self { rows }
    }
}

#[async_trait]
impl QueryBackend for MemoryQueryBackend {
    async fn execute(
        &self,
        query: &ParameterizedQuery,
    ) -> Result<Vec<ResultRow>, Box<dyn Error + Send + Sync>> {
        Ok(evaluate(query.spec(), &self.rows))
    }

    async fn execute_statement(&self, _sql: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}

fn compare(a: &SqlValue, b: &SqlValue) -> Ordering {
    match (a, b) {
        (SqlValue::Text(x), SqlValue::Text(y)) => x.cmp(y),
        (SqlValue::Bool(x), SqlValue::Bool(y)) => x.cmp(y),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
    }
}

fn matches_filters(spec: &QuerySpec, row: &ResultRow) -> bool {
    use super::query::CompareOp;
    spec.filters.iter().all(|p| {
        let Some(cell) = row.get(&p.column) else {
            return false;
        };
        let ordering = compare(cell, &p.value);
        match p.op {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Ge => ordering != Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
        }
    })
}

fn fan_out_rows(spec: &QuerySpec, rows: Vec<ResultRow>) -> Vec<ResultRow> {
    let Some(fan_out) = &spec.fan_out else {
        return rows;
    };
    let mut expanded = Vec::new();
    for row in rows {
        let Some(SqlValue::Array(items)) = row.get(&fan_out.column).cloned() else {
            continue;
        };
        for item in items {
            let mut cells = row.cells().to_vec();
            cells.push((fan_out.alias.clone(), item));
            expanded.push(ResultRow::new(cells));
        }
    }
    expanded
}

fn aggregate_value(func: AggFunc, values: &[f64]) -> SqlValue {
    match func {
        AggFunc::Count => SqlValue::Integer(values.len() as i64),
        AggFunc::Avg => {
            if values.is_empty() {
                SqlValue::Null
            } else {
                SqlValue::Float(values.iter().sum::<f64>() / values.len() as f64)
            }
        }
        AggFunc::Max => values
            .iter()
            .copied()
            .fold(None::<f64>, |acc, v| Some(acc.map_or(v, |a| a.max(v))))
            .map(SqlValue::Float)
            .unwrap_or(SqlValue::Null),
        AggFunc::Min => values
            .iter()
            .copied()
            .fold(None::<f64>, |acc, v| Some(acc.map_or(v, |a| a.min(v))))
            .map(SqlValue::Float)
            .unwrap_or(SqlValue::Null),
        AggFunc::StddevPop => {
            if values.is_empty() {
                SqlValue::Null
            } else {
                let mean = values.iter().sum::<f64>() / values.len() as f64;
                let variance =
                    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
                SqlValue::Float(variance.sqrt())
            }
        }
    }
}

// Missing or non-numeric cells are excluded from the aggregate input;
// COUNT(*) counts rows regardless of cell contents.
fn agg_inputs(column: &str, group: &[ResultRow]) -> Vec<f64> {
    if column == "*" {
        return vec![0.0; group.len()];
    }
    group
        .iter()
        .filter_map(|row| row.get(column).and_then(SqlValue::as_f64))
        .collect()
}

fn evaluate(spec: &QuerySpec, rows: &[ResultRow]) -> Vec<ResultRow> {
    let filtered: Vec<ResultRow> = rows
        .iter()
        .filter(|row| matches_filters(spec, row))
        .cloned()
        .collect();
    let expanded = fan_out_rows(spec, filtered);

    let mut output: Vec<ResultRow> = if spec.aggregates.is_empty() {
        expanded
            .iter()
            .map(|row| {
                ResultRow::new(
                    spec.select
                        .iter()
                        .map(|column| {
                            (
                                column.clone(),
                                row.get(column).cloned().unwrap_or(SqlValue::Null),
                            )
                        })
                        .collect(),
                )
            })
            .collect()
    } else {
        let mut groups: BTreeMap<Vec<String>, Vec<ResultRow>> = BTreeMap::new();
        for row in expanded {
            let key: Vec<String> = spec
                .group_by
                .iter()
                .map(|column| row.get(column).map(|v| v.to_string()).unwrap_or_default())
                .collect();
            groups.entry(key).or_default().push(row);
        }

        let mut grouped = Vec::new();
        for group in groups.values() {
            if let Some(having) = &spec.having {
                let inputs = agg_inputs(&having.column, group);
                let actual = aggregate_value(having.func, &inputs);
                let keep = {
                    use super::query::CompareOp;
                    let ordering = compare(&actual, &having.value);
                    match having.op {
                        CompareOp::Eq => ordering == Ordering::Equal,
                        CompareOp::Gt => ordering == Ordering::Greater,
                        CompareOp::Lt => ordering == Ordering::Less,
                        CompareOp::Ge => ordering != Ordering::Less,
                        CompareOp::Le => ordering != Ordering::Greater,
                    }
                };
                if !keep {
                    continue;
                }
            }

            let mut cells: Vec<(String, SqlValue)> = spec
                .select
                .iter()
                .map(|column| {
                    (
                        column.clone(),
                        group[0].get(column).cloned().unwrap_or(SqlValue::Null),
                    )
                })
                .collect();
            for aggregate in &spec.aggregates {
                let inputs = agg_inputs(&aggregate.column, group);
                cells.push((
                    aggregate.alias.clone(),
                    aggregate_value(aggregate.func, &inputs),
                ));
            }
            grouped.push(ResultRow::new(cells));
        }
        grouped
    };

    if let Some(order_by) = &spec.order_by {
        output.sort_by(|a, b| {
            let ordering = match (a.get(&order_by.column), b.get(&order_by.column)) {
                (Some(x), Some(y)) => compare(x, y),
                _ => Ordering::Equal,
            };
            match order_by.direction {
                super::query::OrderDirection::Ascending => ordering,
                super::query::OrderDirection::Descending => ordering.reverse(),
            }
        });
    }

    if let Some(limit) = spec.limit {
        output.truncate(limit as usize);
    }
    output
}
