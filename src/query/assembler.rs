//! Builds one event per metric from a decoded row.

use crate::error::{Error, Result};
use crate::metrics::{EventTemplate, MetricEvent};
use crate::query::classifier::ColumnRole;
use crate::query::decoder::RowDecoder;
use crate::query::spec::QuerySpec;

/// Turns decoded rows into events, in the declared metric order.
#[derive(Debug, Clone)]
pub struct EventAssembler {
    templates: Vec<EventTemplate>,
}

impl EventAssembler {
    pub fn new(spec: &QuerySpec) -> Self {
        Self {
            templates: spec.metrics.iter().map(EventTemplate::from_spec).collect(),
        }
    }

    pub fn templates(&self) -> &[EventTemplate] {
        &self.templates
    }

    /// Assemble the current row of `decoder`.
    ///
    /// Always returns exactly one event per metric. An event's value is `None`
    /// when its value column was null or absent from the results. Labels that
    /// were null become empty strings.
    pub fn assemble(&self, decoder: &RowDecoder) -> Result<Vec<MetricEvent>> {
        let mut events: Vec<MetricEvent> =
            self.templates.iter().map(EventTemplate::instantiate).collect();

        for (column, holder) in decoder.layout().iter().zip(decoder.holders()) {
            match &column.role {
                ColumnRole::Value(index) => {
                    let value = holder.numeric_value().ok_or_else(|| {
                        Error::Internal(format!(
                            "value column '{}' was not scanned into a numeric holder",
                            column.name
                        ))
                    })?;
                    let event = events.get_mut(*index).ok_or_else(|| {
                        Error::Internal(format!(
                            "value column '{}' mapped to unknown metric {}",
                            column.name, index
                        ))
                    })?;
                    event.value = value;
                }
                ColumnRole::Label(indices) => {
                    let label = holder.text_value().ok_or_else(|| {
                        Error::Internal(format!(
                            "label column '{}' was not scanned into a text holder",
                            column.name
                        ))
                    })?;
                    let label = label.unwrap_or_default();
                    for index in indices {
                        let event = events.get_mut(*index).ok_or_else(|| {
                            Error::Internal(format!(
                                "label column '{}' mapped to unknown metric {}",
                                column.name, index
                            ))
                        })?;
                        event.labels.insert(column.name.clone(), label.to_string());
                    }
                }
                ColumnRole::Unused => {}
            }
        }

        Ok(events)
    }
}
