//! Declarative query specification and its pre-flight validation.

use std::fmt;

use super::schema::TableSchema;
use super::types::SqlValue;

/// Comparison operator for filters and HAVING clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Gt,
    Lt,
    Ge,
    Le,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Ge => ">=",
            CompareOp::Le => "<=",
        }
    }
}

/// A single filter predicate; the value is always bound, never inlined.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub op: CompareOp,
    pub value: SqlValue,
}

/// Fan-out declaration: each element of `column` (an array column) produces
/// one output row under `alias`, paired with the source row's scalars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOut {
    pub column: String,
    pub alias: String,
}

/// Aggregate function over a column (`*` for COUNT).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggFunc {
    Count,
    Avg,
    Max,
    Min,
    StddevPop,
}

impl AggFunc {
    pub fn as_sql(&self) -> &'static str {
        match self {
            AggFunc::Count => "COUNT",
            AggFunc::Avg => "AVG",
            AggFunc::Max => "MAX",
            AggFunc::Min => "MIN",
            AggFunc::StddevPop => "STDDEV_POP",
        }
    }
}

/// One aggregate in the projection, exposed under `alias`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub func: AggFunc,
    pub column: String,
    pub alias: String,
}

/// Post-aggregation filter; the comparison value is bound.
#[derive(Debug, Clone, PartialEq)]
pub struct Having {
    pub func: AggFunc,
    pub column: String,
    pub op: CompareOp,
    pub value: SqlValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Ascending,
    Descending,
}

impl OrderDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            OrderDirection::Ascending => "ASC",
            OrderDirection::Descending => "DESC",
        }
    }
}

/// Ordering column and direction. Ties are left to the backend's natural
/// row order; callers needing strict determinism order by a unique column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: OrderDirection,
}

/// Declarative description of one analytical query.
///
/// Built incrementally; [`QuerySpec::validate`] checks it against a
/// [`TableSchema`] before any SQL is generated or any connection opened.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuerySpec {
    pub table: String,
    pub select: Vec<String>,
    pub filters: Vec<Predicate>,
    pub fan_out: Option<FanOut>,
    pub group_by: Vec<String>,
    pub aggregates: Vec<Aggregate>,
    pub having: Option<Having>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<u32>,
}

impl QuerySpec {
    pub fn from_table(table: impl Into<String>) -> Self {
        QuerySpec {
            table: table.into(),
            ..Default::default()
        }
    }

    pub fn select_column(mut self, column: impl Into<String>) -> Self {
        self.select.push(column.into());
        self
    }

    pub fn select_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn filter(
        mut self,
        column: impl Into<String>,
        op: CompareOp,
        value: impl Into<SqlValue>,
    ) -> Self {
        self.filters.push(Predicate {
            column: column.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn fan_out(mut self, column: impl Into<String>, alias: impl Into<String>) -> Self {
        self.fan_out = Some(FanOut {
            column: column.into(),
            alias: alias.into(),
        });
        self
    }

    pub fn group_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn aggregate(
        mut self,
        func: AggFunc,
        column: impl Into<String>,
        alias: impl Into<String>,
    ) -> Self {
        self.aggregates.push(Aggregate {
            func,
            column: column.into(),
            alias: alias.into(),
        });
        self
    }

    pub fn having(
        mut self,
        func: AggFunc,
        column: impl Into<String>,
        op: CompareOp,
        value: impl Into<SqlValue>,
    ) -> Self {
        self.having = Some(Having {
            func,
            column: column.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: OrderDirection) -> Self {
        self.order_by = Some(OrderBy {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Every column name a projection entry may legally reference: table
    /// scalars, partition columns, and the fan-out alias.
    fn is_selectable(&self, schema: &TableSchema, name: &str) -> bool {
        schema.is_scalar_column(name)
            || self
                .fan_out
                .as_ref()
                .is_some_and(|f| f.alias == name)
    }

    fn is_projected_alias(&self, name: &str) -> bool {
        self.aggregates.iter().any(|a| a.alias == name)
    }

    /// Pre-flight checks; must pass before SQL generation.
    pub fn validate(&self, schema: &TableSchema) -> Result<(), QuerySpecError> {
        if self.table != schema.table {
            return Err(QuerySpecError::UnknownTable {
                table: self.table.clone(),
            });
        }
        if self.select.is_empty() && self.aggregates.is_empty() {
            return Err(QuerySpecError::EmptyProjection);
        }

        if let Some(fan_out) = &self.fan_out {
            if !schema.is_array_column(&fan_out.column) {
                return Err(QuerySpecError::NotAnArrayColumn {
                    column: fan_out.column.clone(),
                });
            }
            check_identifier(&fan_out.alias)?;
            if schema.has_column(&fan_out.alias) {
                return Err(QuerySpecError::AliasShadowsColumn {
                    alias: fan_out.alias.clone(),
                });
            }
        }

        for column in &self.select {
            if !self.is_selectable(schema, column) {
                return Err(QuerySpecError::UnknownColumn {
                    column: column.clone(),
                    table: self.table.clone(),
                });
            }
        }
        for predicate in &self.filters {
            if !self.is_selectable(schema, &predicate.column) {
                return Err(QuerySpecError::UnknownColumn {
                    column: predicate.column.clone(),
                    table: self.table.clone(),
                });
            }
        }

        if !self.aggregates.is_empty() && self.group_by.is_empty() {
            return Err(QuerySpecError::AggregateWithoutGroupBy);
        }
        for column in &self.group_by {
            if !self.is_selectable(schema, column) {
                return Err(QuerySpecError::UnknownColumn {
                    column: column.clone(),
                    table: self.table.clone(),
                });
            }
        }
        if !self.aggregates.is_empty() {
            // Plain projected columns must be grouping keys.
            for column in &self.select {
                if !self.group_by.contains(column) {
                    return Err(QuerySpecError::UngroupedColumn {
                        column: column.clone(),
                    });
                }
            }
        }
        for aggregate in &self.aggregates {
            check_identifier(&aggregate.alias)?;
            if aggregate.column != "*" && !self.is_selectable(schema, &aggregate.column) {
                return Err(QuerySpecError::UnknownColumn {
                    column: aggregate.column.clone(),
                    table: self.table.clone(),
                });
            }
        }

        if let Some(having) = &self.having {
            if self.aggregates.is_empty() {
                return Err(QuerySpecError::HavingWithoutAggregate);
            }
            if having.column != "*" && !self.is_selectable(schema, &having.column) {
                return Err(QuerySpecError::UnknownColumn {
                    column: having.column.clone(),
                    table: self.table.clone(),
                });
            }
        }

        if let Some(order_by) = &self.order_by {
            let known = self.is_selectable(schema, &order_by.column)
                || self.is_projected_alias(&order_by.column);
            if !known {
                return Err(QuerySpecError::UnknownOrderColumn {
                    column: order_by.column.clone(),
                });
            }
        }

        if self.limit == Some(0) {
            return Err(QuerySpecError::InvalidLimit(0));
        }

        Ok(())
    }
}

fn check_identifier(name: &str) -> Result<(), QuerySpecError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_lowercase() || first == '_')
                && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(QuerySpecError::InvalidIdentifier {
            name: name.to_string(),
        })
    }
}

/// Malformed query specification, detected before any connection is opened.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuerySpecError {
    #[error("unknown table '{table}'")]
    UnknownTable { table: String },

    #[error("column '{column}' does not exist in table '{table}'")]
    UnknownColumn { column: String, table: String },

    #[error("column '{column}' is not an array column and cannot be fanned out")]
    NotAnArrayColumn { column: String },

    #[error("fan-out alias '{alias}' shadows an existing column")]
    AliasShadowsColumn { alias: String },

    #[error("'{name}' is not a valid identifier")]
    InvalidIdentifier { name: String },

    #[error("projection is empty")]
    EmptyProjection,

    #[error("aggregates require at least one GROUP BY column")]
    AggregateWithoutGroupBy,

    #[error("projected column '{column}' must appear in GROUP BY")]
    UngroupedColumn { column: String },

    #[error("HAVING requires an aggregate projection")]
    HavingWithoutAggregate,

    #[error("limit must be at least 1, got {0}")]
    InvalidLimit(u32),

    #[error("unknown ORDER BY column '{column}'")]
    UnknownOrderColumn { column: String },
}

impl fmt::Display for QuerySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "query on '{}'", self.table)?;
        if let Some(fan_out) = &self.fan_out {
            write!(f, " fan-out {}", fan_out.column)?;
        }
        if !self.group_by.is_empty() {
            write!(f, " grouped by {}", self.group_by.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> TableSchema {
        TableSchema::tweets()
    }

    #[test]
    fn test_simple_top_k_spec_is_valid() {
        let spec = QuerySpec::from_table("tweets")
            .select_columns(["tweet_id", "content", "like_count"])
            .filter("like_count", CompareOp::Gt, 0i64)
            .order_by("like_count", OrderDirection::Descending)
            .limit(10);
        assert_eq!(spec.validate(&schema()), Ok(()));
    }

    #[test]
    fn test_fan_out_requires_array_column() {
        let spec = QuerySpec::from_table("tweets")
            .fan_out("content", "word")
            .select_column("word")
            .group_by(["word"])
            .aggregate(AggFunc::Count, "*", "frequency");
        assert_eq!(
            spec.validate(&schema()),
            Err(QuerySpecError::NotAnArrayColumn {
                column: "content".to_string()
            })
        );
    }

    #[test]
    fn test_fan_out_alias_is_selectable() {
        let spec = QuerySpec::from_table("tweets")
            .fan_out("hashtags", "hashtag")
            .select_column("hashtag")
            .group_by(["hashtag"])
            .aggregate(AggFunc::Count, "*", "frequency")
            .order_by("frequency", OrderDirection::Descending)
            .limit(5);
        assert_eq!(spec.validate(&schema()), Ok(()));
    }

    #[test]
    fn test_aggregate_without_group_by_rejected() {
        let spec = QuerySpec::from_table("tweets").aggregate(AggFunc::Count, "*", "total");
        assert_eq!(
            spec.validate(&schema()),
            Err(QuerySpecError::AggregateWithoutGroupBy)
        );
    }

    #[test]
    fn test_ungrouped_projection_rejected() {
        let spec = QuerySpec::from_table("tweets")
            .select_columns(["celebrity_category", "username"])
            .group_by(["celebrity_category"])
            .aggregate(AggFunc::Avg, "like_count", "avg_likes");
        assert_eq!(
            spec.validate(&schema()),
            Err(QuerySpecError::UngroupedColumn {
                column: "username".to_string()
            })
        );
    }

    #[test]
    fn test_unknown_column_rejected_everywhere() {
        let base = || QuerySpec::from_table("tweets").select_column("tweet_id");
        assert!(matches!(
            base().select_column("nope").validate(&schema()),
            Err(QuerySpecError::UnknownColumn { .. })
        ));
        assert!(matches!(
            base()
                .filter("nope", CompareOp::Eq, 1i64)
                .validate(&schema()),
            Err(QuerySpecError::UnknownColumn { .. })
        ));
        assert!(matches!(
            base()
                .order_by("nope", OrderDirection::Ascending)
                .validate(&schema()),
            Err(QuerySpecError::UnknownOrderColumn { .. })
        ));
    }

    #[test]
    fn test_zero_limit_rejected() {
        let spec = QuerySpec::from_table("tweets").select_column("tweet_id").limit(0);
        assert_eq!(spec.validate(&schema()), Err(QuerySpecError::InvalidLimit(0)));
    }

    #[test]
    fn test_bad_alias_rejected() {
        let spec = QuerySpec::from_table("tweets")
            .fan_out("hashtags", "h; DROP TABLE tweets")
            .select_column("h; DROP TABLE tweets");
        assert!(matches!(
            spec.validate(&schema()),
            Err(QuerySpecError::InvalidIdentifier { .. })
        ));
    }
}
