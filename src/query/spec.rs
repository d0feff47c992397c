//! Declarative description of how a query's columns become metric events.

use crate::storage::SqlValue;
use serde::{Deserialize, Serialize};

/// One metric produced from every row of a query.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MetricSpec {
    /// Name of the emitted metric
    #[serde(alias = "metric_name")]
    pub name: String,
    /// Column holding the numeric value
    pub value_column: String,
    /// Columns attached to the event as labels
    #[serde(default, alias = "dimension_columns")]
    pub label_columns: Vec<String>,
    /// Emit as a counter instead of a gauge
    #[serde(default)]
    pub is_cumulative: bool,
}

impl MetricSpec {
    pub fn gauge(name: impl Into<String>, value_column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value_column: value_column.into(),
            label_columns: Vec::new(),
            is_cumulative: false,
        }
    }

    pub fn counter(name: impl Into<String>, value_column: impl Into<String>) -> Self {
        Self {
            is_cumulative: true,
            ..Self::gauge(name, value_column)
        }
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.label_columns = labels.into_iter().map(Into::into).collect();
        self
    }
}

/// A statement, its parameters and the metrics derived from its rows.
///
/// The order of `metrics` fixes the order of events produced for each row.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct QuerySpec {
    #[serde(alias = "query")]
    pub statement: String,
    #[serde(default)]
    pub params: Vec<SqlValue>,
    #[serde(default)]
    pub metrics: Vec<MetricSpec>,
}

impl QuerySpec {
    pub fn new(statement: impl Into<String>, metrics: Vec<MetricSpec>) -> Self {
        Self {
            statement: statement.into(),
            params: Vec::new(),
            metrics,
        }
    }

    pub fn with_params(mut self, params: Vec<SqlValue>) -> Self {
        self.params = params;
        self
    }
}
