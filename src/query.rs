//! Structured filters for `select` and `delete_where`.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Query operators for building filters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryOperator {
    Equal(Value),
    NotEqual(Value),
    GreaterThan(Value),
    GreaterThanOrEqual(Value),
    LessThan(Value),
    LessThanOrEqual(Value),
    Like(String),
    In(Vec<Value>),
}

/// Filter made of conditions joined with `AND`.
///
/// Values are rendered as escaped literals, unlike the raw filter strings
/// accepted by [`crate::Session::query`].
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub conditions: Vec<(String, QueryOperator)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_condition(mut self, field: &str, op: QueryOperator) -> Self {
        self.conditions.push((field.to_string(), op));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Render to a filter string; empty when there are no conditions.
    pub fn to_filter(&self) -> String {
        self.conditions
            .iter()
            .map(|(field, op)| render_condition(field, op))
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

fn render_condition(field: &str, op: &QueryOperator) -> String {
    match op {
        QueryOperator::Equal(Value::Null) => format!("{field} IS NULL"),
        QueryOperator::NotEqual(Value::Null) => format!("{field} IS NOT NULL"),
        QueryOperator::Equal(v) => format!("{field} = {v}"),
        QueryOperator::NotEqual(v) => format!("{field} <> {v}"),
        QueryOperator::GreaterThan(v) => format!("{field} > {v}"),
        QueryOperator::GreaterThanOrEqual(v) => format!("{field} >= {v}"),
        QueryOperator::LessThan(v) => format!("{field} < {v}"),
        QueryOperator::LessThanOrEqual(v) => format!("{field} <= {v}"),
        QueryOperator::Like(pattern) => format!("{field} LIKE {}", Value::from(pattern.as_str())),
        // empty set matches nothing
        QueryOperator::In(values) if values.is_empty() => "0".to_string(),
        QueryOperator::In(values) => {
            let list = values
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            format!("{field} IN ({list})")
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_filter())
    }
}
