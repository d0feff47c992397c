//! Metric events and the sinks they are delivered to.
//!
//! Each configured metric gets an [`EventTemplate`] holding everything that
//! never changes between rows. Events are instantiated from the template per
//! row, so no emitted event shares mutable state with the template or with
//! any other event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::query::MetricSpec;

/// Kind of an emitted metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Instantaneous measurement
    Gauge,
    /// Monotonically non-decreasing total
    Counter,
}

/// One metric measurement derived from a result row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEvent {
    pub name: String,
    pub kind: MetricKind,
    /// Measured value; `None` when the row carried no value for this metric
    pub value: Option<f64>,
    /// Labels keyed by the result column name as reported by the database
    pub labels: BTreeMap<String, String>,
    /// Time of the measurement; left unset for the sink to assign on delivery
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl MetricEvent {
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// The row-invariant part of a metric's events.
#[derive(Debug, Clone, PartialEq)]
pub struct EventTemplate {
    name: String,
    kind: MetricKind,
    timestamp: Option<DateTime<Utc>>,
}

impl EventTemplate {
    pub fn from_spec(spec: &MetricSpec) -> Self {
        Self {
            name: spec.name.clone(),
            kind: if spec.is_cumulative {
                MetricKind::Counter
            } else {
                MetricKind::Gauge
            },
            timestamp: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    /// A fresh event with no value and empty labels.
    pub fn instantiate(&self) -> MetricEvent {
        MetricEvent {
            name: self.name.clone(),
            kind: self.kind,
            value: None,
            labels: BTreeMap::new(),
            timestamp: self.timestamp,
        }
    }
}

/// Receiver of emitted events.
///
/// `send` must not block the caller; delivery is fire-and-forget.
pub trait EventSink: Send + Sync {
    fn send(&self, event: MetricEvent);
}

impl<F> EventSink for F
where
    F: Fn(MetricEvent) + Send + Sync,
{
    fn send(&self, event: MetricEvent) {
        self(event)
    }
}

/// Sink forwarding events into an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<MetricEvent>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<MetricEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn send(&self, event: MetricEvent) {
        if let Err(e) = self.tx.send(event) {
            debug!(metric = %e.0.name, "Event receiver closed, dropping event");
        }
    }
}
