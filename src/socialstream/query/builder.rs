//! SQL synthesis from a validated [`QuerySpec`].
//!
//! Scalar values (filter comparisons, HAVING thresholds, LIMIT) are emitted
//! as `?` placeholders with a positional parameter list. Identifiers are
//! validated against the table schema before they are spliced, so no
//! caller-supplied string ever reaches the SQL text unchecked.

use super::schema::TableSchema;
use super::spec::{QuerySpec, QuerySpecError};
use super::types::SqlValue;

/// SQL text plus its positional parameters, ready for a backend.
///
/// The originating spec is retained so fixture backends can interpret the
/// query without parsing SQL.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterizedQuery {
    sql: String,
    params: Vec<SqlValue>,
    spec: QuerySpec,
}

impl ParameterizedQuery {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }
}

/// Translate `spec` into backend SQL. Fails pre-flight if the spec does not
/// validate against `schema`.
pub fn build(spec: &QuerySpec, schema: &TableSchema) -> Result<ParameterizedQuery, QuerySpecError> {
    spec.validate(schema)?;

    let mut params = Vec::new();
    let mut sql = String::from("SELECT ");

    let mut projection: Vec<String> = spec.select.clone();
    for aggregate in &spec.aggregates {
        projection.push(format!(
            "{}({}) AS {}",
            aggregate.func.as_sql(),
            aggregate.column,
            aggregate.alias
        ));
    }
    sql.push_str(&projection.join(", "));

    sql.push_str(" FROM ");
    sql.push_str(&spec.table);

    if let Some(fan_out) = &spec.fan_out {
        // Hive-style one-to-many explode join.
        sql.push_str(&format!(
            " LATERAL VIEW explode({col}) {col}_table AS {alias}",
            col = fan_out.column,
            alias = fan_out.alias
        ));
    }

    if !spec.filters.is_empty() {
        sql.push_str(" WHERE ");
        let clauses: Vec<String> = spec
            .filters
            .iter()
            .map(|p| {
                params.push(p.value.clone());
                format!("{} {} ?", p.column, p.op.as_sql())
            })
            .collect();
        sql.push_str(&clauses.join(" AND "));
    }

    if !spec.group_by.is_empty() {
        sql.push_str(" GROUP BY ");
        sql.push_str(&spec.group_by.join(", "));
    }

    if let Some(having) = &spec.having {
        params.push(having.value.clone());
        sql.push_str(&format!(
            " HAVING {}({}) {} ?",
            having.func.as_sql(),
            having.column,
            having.op.as_sql()
        ));
    }

    if let Some(order_by) = &spec.order_by {
        sql.push_str(&format!(
            " ORDER BY {} {}",
            order_by.column,
            order_by.direction.as_sql()
        ));
    }

    if let Some(limit) = spec.limit {
        params.push(SqlValue::Integer(i64::from(limit)));
        sql.push_str(" LIMIT ?");
    }

    Ok(ParameterizedQuery {
        sql,
        params,
        spec: spec.clone(),
    })
}
