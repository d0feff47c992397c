//! Row classification and decoding engine.
//!
//! A query's result columns are only known once it has executed. This module
//! turns those rows into metric events:
//! - `classifier`: assigns each discovered column a role (value, label, unused)
//! - `decoder`: scans rows into a scan buffer laid out once per query
//! - `assembler`: builds one event per declared metric for the current row
//! - `querier`: the per-query loop forwarding events to a sink

pub mod assembler;
pub mod classifier;
pub mod decoder;
pub mod querier;
pub mod spec;

pub use assembler::EventAssembler;
pub use classifier::{ClassifiedColumn, ColumnLayout, ColumnRole};
pub use decoder::{RowDecoder, ScanHolder};
pub use querier::{Querier, RunStats};
pub use spec::{MetricSpec, QuerySpec};
