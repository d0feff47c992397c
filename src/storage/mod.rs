//! Query execution backends.
//!
//! This module defines the narrow seam between the metrics engine and a
//! database:
//! - `QueryExecutor`: runs a statement and hands back a row cursor
//! - `RowCursor`: pull-based iteration over the result rows
//!
//! Two implementations are provided:
//! - `duckdb`: embedded DuckDB, results read through Arrow record batches
//! - `memory`: fixed in-memory rows for tests and dry runs

pub mod duckdb;
pub mod memory;

pub use self::duckdb::DuckDbExecutor;
pub use self::memory::MemoryExecutor;

use crate::error::Result;
use crate::query::ScanHolder;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use tokio_util::sync::CancellationToken;

/// An owned SQL scalar, used for statement parameters and in-memory rows.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl SqlValue {
    pub fn as_value_ref(&self) -> ValueRef<'_> {
        match self {
            SqlValue::Null => ValueRef::Null,
            SqlValue::Bool(b) => ValueRef::Bool(*b),
            SqlValue::Int(i) => ValueRef::Int(*i),
            SqlValue::Float(f) => ValueRef::Float(*f),
            SqlValue::Text(s) => ValueRef::Text(Cow::Borrowed(s)),
        }
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// A borrowed view of one cell of the current row, as handed to scan holders.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueRef<'a> {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(Cow<'a, str>),
}

impl fmt::Display for ValueRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueRef::Null => write!(f, "NULL"),
            ValueRef::Bool(b) => write!(f, "{}", b),
            ValueRef::Int(i) => write!(f, "{}", i),
            ValueRef::UInt(u) => write!(f, "{}", u),
            ValueRef::Float(v) => write!(f, "{}", v),
            ValueRef::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Executes statements against a database.
///
/// An executor is owned by a single querier; nothing is shared between
/// executors of different queries.
pub trait QueryExecutor: Send {
    /// Execute `statement` with positional `params`.
    ///
    /// Failures are reported as `Error::Execution` carrying the statement text.
    fn execute(
        &mut self,
        statement: &str,
        params: &[SqlValue],
        cancel: &CancellationToken,
    ) -> Result<Box<dyn RowCursor + '_>>;
}

/// Pull-based cursor over the rows of one executed statement.
pub trait RowCursor {
    /// Move to the next row. Returns `Ok(false)` once the rows are exhausted.
    fn advance(&mut self) -> Result<bool>;

    /// Names of the result columns, in result order.
    fn column_names(&self) -> Result<Vec<String>>;

    /// Scan the current row into `holders`, one holder per column.
    fn scan_into(&mut self, holders: &mut [ScanHolder]) -> Result<()>;

    /// Release the cursor's resources.
    fn close(&mut self) -> Result<()>;
}
