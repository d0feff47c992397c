//! Core library turning SQL query results into metric events.
//!
//! This crate provides:
//! - Declarative metric specifications per query
//! - Case-insensitive classification of discovered result columns
//! - Row decoding into a reusable scan buffer and per-row event assembly
//! - DuckDB and in-memory query executors
//! - A scheduler running each configured query independently

pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod monitor;
pub mod query;
pub mod storage;

pub use config::MonitorConfig;
pub use error::{Error, Result};
pub use metrics::{ChannelSink, EventSink, EventTemplate, MetricEvent, MetricKind};
pub use monitor::Monitor;
pub use query::{MetricSpec, Querier, QuerySpec, RunStats};
pub use storage::{QueryExecutor, RowCursor, SqlValue};
