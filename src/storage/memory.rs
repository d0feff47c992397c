//! In-memory executor returning a fixed result set.
//!
//! Every execution yields the same columns and rows regardless of the
//! statement text, which makes it useful for exercising query configurations
//! without a database.

use crate::error::{Error, Result};
use crate::query::ScanHolder;
use crate::storage::{QueryExecutor, RowCursor, SqlValue};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct MemoryExecutor {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
    executions: usize,
}

impl MemoryExecutor {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows,
            executions: 0,
        }
    }

    /// Replace the rows returned by subsequent executions.
    pub fn set_rows(&mut self, rows: Vec<Vec<SqlValue>>) {
        self.rows = rows;
    }

    /// Number of statements executed so far.
    pub fn executions(&self) -> usize {
        self.executions
    }
}

impl QueryExecutor for MemoryExecutor {
    fn execute(
        &mut self,
        _statement: &str,
        _params: &[SqlValue],
        cancel: &CancellationToken,
    ) -> Result<Box<dyn RowCursor + '_>> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.executions += 1;
        Ok(Box::new(MemoryCursor {
            columns: &self.columns,
            rows: &self.rows,
            position: None,
            cancel: cancel.clone(),
            closed: false,
        }))
    }
}

struct MemoryCursor<'a> {
    columns: &'a [String],
    rows: &'a [Vec<SqlValue>],
    position: Option<usize>,
    cancel: CancellationToken,
    closed: bool,
}

impl RowCursor for MemoryCursor<'_> {
    fn advance(&mut self) -> Result<bool> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if self.closed {
            return Ok(false);
        }
        let next = self.position.map_or(0, |p| p + 1);
        self.position = Some(next);
        Ok(next < self.rows.len())
    }

    fn column_names(&self) -> Result<Vec<String>> {
        Ok(self.columns.to_vec())
    }

    fn scan_into(&mut self, holders: &mut [ScanHolder]) -> Result<()> {
        let row = self
            .position
            .and_then(|p| self.rows.get(p))
            .ok_or_else(|| Error::Decode {
                column: None,
                message: "scan called without a current row".to_string(),
            })?;
        if holders.len() != row.len() {
            return Err(Error::Decode {
                column: None,
                message: format!(
                    "got {} destination holders, row has {} columns",
                    holders.len(),
                    row.len()
                ),
            });
        }
        for (i, (holder, value)) in holders.iter_mut().zip(row).enumerate() {
            holder.scan(i, value.as_value_ref())?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
