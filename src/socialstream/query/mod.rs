//! Analytical query synthesis and execution
//!
//! A [`QuerySpec`] describes a query declaratively: filters, an optional
//! fan-out over a multi-valued column, grouped aggregation, ordering and a
//! limit. [`build`] turns it into a [`ParameterizedQuery`] whose scalar
//! values are always positional bound parameters, never interpolated into
//! the SQL text. [`QueryExecutor`] runs the result through a resiliently
//! acquired [`QueryBackend`] connection, exactly one per execute call.
//!
//! Malformed specs fail pre-flight with [`QuerySpecError`] before any
//! connection is opened.

pub mod builder;
pub mod executor;
pub mod schema;
pub mod spec;
pub mod types;

pub use builder::{build, ParameterizedQuery};
pub use executor::{QueryBackend, QueryExecutor, QueryService};
pub use schema::TableSchema;
pub use spec::{
    AggFunc, Aggregate, CompareOp, FanOut, Having, OrderBy, OrderDirection, Predicate, QuerySpec,
    QuerySpecError,
};
pub use types::{ResultRow, SqlValue};

use super::connect::ConnectError;

/// Query-layer failure.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Malformed spec, detected before any connection was attempted.
    #[error(transparent)]
    Spec(#[from] QuerySpecError),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// The backend accepted the connection but the statement failed.
    #[error("query execution failed: {message}")]
    Execution {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl QueryError {
    pub fn execution(
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        QueryError::Execution {
            message: message.into(),
            source: Some(source),
        }
    }
}
