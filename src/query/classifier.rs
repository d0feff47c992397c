//! Column classification.
//!
//! Maps every discovered result column to the role it plays for the query's
//! metrics. Matching is by name only and case-insensitive; value types are
//! enforced later when rows are scanned.

use crate::error::{Error, Result};
use crate::query::spec::QuerySpec;
use std::collections::HashMap;
use tracing::warn;

/// The role of one discovered column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRole {
    /// Supplies the value of the metric at this index
    Value(usize),
    /// Supplies a label shared by the metrics at these indices (ascending)
    Label(Vec<usize>),
    /// Not used by any metric
    Unused,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedColumn {
    /// Column name as reported by the database
    pub name: String,
    pub role: ColumnRole,
}

/// Positional column roles for one query shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    columns: Vec<ClassifiedColumn>,
}

impl ColumnLayout {
    /// Classify `discovered` against the metrics of `spec`.
    ///
    /// Fails with `Error::Config` if a declared label column of any metric is
    /// not among the discovered columns as a label for that metric.
    pub fn classify<S: AsRef<str>>(discovered: &[S], spec: &QuerySpec) -> Result<Self> {
        let layout = Self::assign_roles(discovered, spec);
        layout.verify_labels(spec)?;

        for (index, metric) in spec.metrics.iter().enumerate() {
            if layout.value_column_of(index).is_none() {
                warn!(
                    metric = %metric.name,
                    value_column = %metric.value_column,
                    "Value column is not among the query's result columns"
                );
            }
        }
        Ok(layout)
    }

    /// Assign a role to each column without validating label coverage.
    ///
    /// A value match takes priority over any label match; among metrics
    /// sharing a value column, the first declared one wins.
    pub fn assign_roles<S: AsRef<str>>(discovered: &[S], spec: &QuerySpec) -> Self {
        let mut value_columns: HashMap<String, usize> = HashMap::new();
        let mut label_columns: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, metric) in spec.metrics.iter().enumerate() {
            value_columns
                .entry(metric.value_column.to_lowercase())
                .or_insert(index);
            for label in &metric.label_columns {
                let metrics = label_columns.entry(label.to_lowercase()).or_default();
                if !metrics.contains(&index) {
                    metrics.push(index);
                }
            }
        }

        let columns = discovered
            .iter()
            .map(|name| {
                let name = name.as_ref();
                let folded = name.to_lowercase();
                let role = if let Some(&index) = value_columns.get(&folded) {
                    ColumnRole::Value(index)
                } else if let Some(metrics) = label_columns.get(&folded) {
                    ColumnRole::Label(metrics.clone())
                } else {
                    ColumnRole::Unused
                };
                ClassifiedColumn {
                    name: name.to_string(),
                    role,
                }
            })
            .collect();

        Self { columns }
    }

    fn verify_labels(&self, spec: &QuerySpec) -> Result<()> {
        for (index, metric) in spec.metrics.iter().enumerate() {
            for label in &metric.label_columns {
                let found = self.columns.iter().any(|column| {
                    matches!(&column.role, ColumnRole::Label(metrics) if metrics.contains(&index))
                        && column.name.to_lowercase() == label.to_lowercase()
                });
                if !found {
                    return Err(Error::Config(format!(
                        "label column '{}' of metric '{}' does not exist in the query results",
                        label, metric.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Position of the column supplying the value of metric `index`.
    pub fn value_column_of(&self, index: usize) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.role == ColumnRole::Value(index))
    }

    pub fn roles(&self) -> impl Iterator<Item = &ColumnRole> {
        self.columns.iter().map(|column| &column.role)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ClassifiedColumn> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
