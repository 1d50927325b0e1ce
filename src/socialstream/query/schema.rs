//! Table schemas that query specifications validate column references
//! against.

/// Columns of one backend table: scalars, string-array columns eligible for
/// fan-out, and the partition-column tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<String>,
    pub array_columns: Vec<String>,
    pub partition_columns: Vec<String>,
}

impl TableSchema {
    /// Schema of the primary partitioned entity.
    pub fn tweets() -> Self {
        TableSchema {
            table: "tweets".to_string(),
            columns: [
                "tweet_id",
                "user_id",
                "username",
                "content",
                "tweet_timestamp",
                "like_count",
                "retweet_count",
                "reply_count",
                "is_celebrity",
                "celebrity_category",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            array_columns: vec!["hashtags".to_string(), "mentions".to_string()],
            partition_columns: ["year", "month", "day", "hour"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }

    pub fn is_scalar_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
            || self.partition_columns.iter().any(|c| c == name)
    }

    pub fn is_array_column(&self, name: &str) -> bool {
        self.array_columns.iter().any(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.is_scalar_column(name) || self.is_array_column(name)
    }
}
