//! Query execution over a resiliently acquired backend connection.

use async_trait::async_trait;
use log::{debug, info};
use std::error::Error;
use std::sync::Arc;

use super::super::connect::{BackendTarget, ResilientConnector};
use super::builder::{build, ParameterizedQuery};
use super::schema::TableSchema;
use super::spec::{AggFunc, CompareOp, OrderDirection, QuerySpec};
use super::types::ResultRow;
use super::QueryError;

/// A live connection to the SQL-capable query service.
///
/// `execute` receives the parameterized SQL text and its positional
/// parameters via [`ParameterizedQuery`]; `execute_statement` runs
/// parameterless DDL.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    async fn execute(
        &self,
        query: &ParameterizedQuery,
    ) -> Result<Vec<ResultRow>, Box<dyn Error + Send + Sync>>;

    async fn execute_statement(&self, sql: &str) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Dials one connection to the query service; called once per attempt.
#[async_trait]
pub trait QueryService: Send + Sync {
    async fn dial(&self) -> Result<Arc<dyn QueryBackend>, Box<dyn Error + Send + Sync>>;
}

/// Synthesizes analytical queries and executes them, acquiring exactly one
/// connection per call and releasing it on completion or error.
pub struct QueryExecutor {
    service: Arc<dyn QueryService>,
    connector: ResilientConnector,
    target: BackendTarget,
    schema: TableSchema,
}

impl QueryExecutor {
    pub fn new(
        service: Arc<dyn QueryService>,
        target: BackendTarget,
        connector: ResilientConnector,
    ) -> Self {
        Self {
            service,
            connector,
            target,
            schema: TableSchema::tweets(),
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Validate, build and run `spec`. Spec errors surface before any
    /// connection is attempted.
    pub async fn execute(&self, spec: &QuerySpec) -> Result<Vec<ResultRow>, QueryError> {
        let query = build(spec, &self.schema)?;
        debug!("executing: {} (params: {:?})", query.sql(), query.params());

        let backend = self
            .connector
            .connect(&self.target, || self.service.dial())
            .await?;
        let rows = backend
            .execute(&query)
            .await
            .map_err(|e| QueryError::execution(query.sql(), e))?;
        info!("query returned {} rows", rows.len());
        Ok(rows)
    }

    /// Run parameterless DDL through a fresh connection.
    async fn execute_statement(&self, sql: &str) -> Result<(), QueryError> {
        debug!("executing statement: {}", sql);
        let backend = self
            .connector
            .connect(&self.target, || self.service.dial())
            .await?;
        backend
            .execute_statement(sql)
            .await
            .map_err(|e| QueryError::execution(sql, e))
    }

    /// Idempotent DDL for the partitioned tweets table backing `location`.
    ///
    /// `location` is operator-supplied configuration, never record data.
    pub async fn ensure_tweets_table(&self, location: &str) -> Result<(), QueryError> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS tweets (\
             tweet_id STRING, \
             user_id STRING, \
             username STRING, \
             content STRING, \
             tweet_timestamp BIGINT, \
             like_count INT, \
             retweet_count INT, \
             reply_count INT, \
             is_celebrity BOOLEAN, \
             celebrity_category STRING, \
             hashtags ARRAY<STRING>, \
             mentions ARRAY<STRING>\
             ) PARTITIONED BY (year INT, month INT, day INT, hour INT) \
             STORED AS PARQUET LOCATION '{}'",
            location
        );
        self.execute_statement(&sql).await?;
        info!("tweets table ready at {}", location);
        Ok(())
    }

    // Named analytics over the partitioned dataset. Every scalar is bound.

    pub async fn most_liked_tweets(&self, limit: u32) -> Result<Vec<ResultRow>, QueryError> {
        let spec = QuerySpec::from_table("tweets")
            .select_columns(["tweet_id", "content", "like_count", "username", "celebrity_category"])
            .filter("like_count", CompareOp::Gt, 0i64)
            .order_by("like_count", OrderDirection::Descending)
            .limit(limit);
        self.execute(&spec).await
    }

    pub async fn most_retweeted_tweets(&self, limit: u32) -> Result<Vec<ResultRow>, QueryError> {
        let spec = QuerySpec::from_table("tweets")
            .select_columns([
                "tweet_id",
                "content",
                "retweet_count",
                "username",
                "celebrity_category",
            ])
            .filter("retweet_count", CompareOp::Gt, 0i64)
            .order_by("retweet_count", OrderDirection::Descending)
            .limit(limit);
        self.execute(&spec).await
    }

    pub async fn popular_celebrity_tweets(
        &self,
        category: &str,
        limit: u32,
    ) -> Result<Vec<ResultRow>, QueryError> {
        let spec = QuerySpec::from_table("tweets")
            .select_columns(["tweet_id", "content", "like_count", "retweet_count", "username"])
            .filter("is_celebrity", CompareOp::Eq, true)
            .filter("celebrity_category", CompareOp::Eq, category)
            .order_by("like_count", OrderDirection::Descending)
            .limit(limit);
        self.execute(&spec).await
    }

    /// Fan out the hashtags column: one output row per hashtag occurrence.
    pub async fn trending_hashtags(&self, limit: u32) -> Result<Vec<ResultRow>, QueryError> {
        let spec = QuerySpec::from_table("tweets")
            .fan_out("hashtags", "hashtag")
            .select_column("hashtag")
            .group_by(["hashtag"])
            .aggregate(AggFunc::Count, "*", "frequency")
            .order_by("frequency", OrderDirection::Descending)
            .limit(limit);
        self.execute(&spec).await
    }

    /// Fan out the mentions column: one output row per mention occurrence.
    pub async fn most_mentioned_users(&self, limit: u32) -> Result<Vec<ResultRow>, QueryError> {
        let spec = QuerySpec::from_table("tweets")
            .fan_out("mentions", "mention")
            .select_column("mention")
            .group_by(["mention"])
            .aggregate(AggFunc::Count, "*", "mention_count")
            .order_by("mention_count", OrderDirection::Descending)
            .limit(limit);
        self.execute(&spec).await
    }

    pub async fn celebrity_engagement_stats(&self) -> Result<Vec<ResultRow>, QueryError> {
        let spec = QuerySpec::from_table("tweets")
            .select_column("celebrity_category")
            .filter("is_celebrity", CompareOp::Eq, true)
            .group_by(["celebrity_category"])
            .aggregate(AggFunc::Count, "*", "tweet_count")
            .aggregate(AggFunc::Avg, "like_count", "avg_likes")
            .aggregate(AggFunc::Avg, "retweet_count", "avg_retweets")
            .aggregate(AggFunc::Max, "like_count", "max_likes")
            .order_by("avg_likes", OrderDirection::Descending);
        self.execute(&spec).await
    }

    /// Engagement stats with spread measures, restricted to categories with
    /// more than five tweets.
    pub async fn advanced_engagement_stats(&self) -> Result<Vec<ResultRow>, QueryError> {
        let spec = QuerySpec::from_table("tweets")
            .select_column("celebrity_category")
            .filter("is_celebrity", CompareOp::Eq, true)
            .group_by(["celebrity_category"])
            .aggregate(AggFunc::Count, "*", "tweet_count")
            .aggregate(AggFunc::Avg, "like_count", "avg_likes")
            .aggregate(AggFunc::Avg, "retweet_count", "avg_retweets")
            .aggregate(AggFunc::Max, "like_count", "max_likes")
            .aggregate(AggFunc::Min, "like_count", "min_likes")
            .aggregate(AggFunc::StddevPop, "like_count", "stddev_likes")
            .having(AggFunc::Count, "*", CompareOp::Gt, 5i64)
            .order_by("avg_likes", OrderDirection::Descending);
        self.execute(&spec).await
    }

    /// Hourly activity within one month, filtered on partition columns.
    pub async fn time_based_analytics(
        &self,
        year: i64,
        month: i64,
    ) -> Result<Vec<ResultRow>, QueryError> {
        let spec = QuerySpec::from_table("tweets")
            .select_columns(["day", "hour"])
            .filter("year", CompareOp::Eq, year)
            .filter("month", CompareOp::Eq, month)
            .group_by(["day", "hour"])
            .aggregate(AggFunc::Count, "*", "tweet_count")
            .aggregate(AggFunc::Avg, "like_count", "avg_likes")
            .order_by("day", OrderDirection::Ascending);
        self.execute(&spec).await
    }
}
