//! Common test utilities for the SQL metrics engine

#![allow(dead_code)]

use parking_lot::Mutex;
use sqlmetrics_core::{
    query::ScanHolder, Error, EventSink, MetricEvent, QueryExecutor, Result, RowCursor, SqlValue,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Sink collecting every event it receives.
#[derive(Default, Clone)]
pub struct CollectingSink {
    events: Arc<Mutex<Vec<MetricEvent>>>,
}

impl CollectingSink {
    pub fn events(&self) -> Vec<MetricEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }
}

impl EventSink for CollectingSink {
    fn send(&self, event: MetricEvent) {
        self.events.lock().push(event);
    }
}

/// Counters shared between a scripted executor and the test inspecting it.
#[derive(Default, Debug)]
pub struct CursorProbe {
    pub executions: AtomicUsize,
    pub column_name_calls: AtomicUsize,
    pub rows_fetched: AtomicUsize,
    pub closes: AtomicUsize,
}

impl CursorProbe {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// Executor returning fixed rows, with optional injected failures.
pub struct ScriptedExecutor {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
    /// Reject the statement with this message
    pub reject_with: Option<String>,
    /// Fail when advancing to this row index
    pub fail_at_row: Option<usize>,
    pub probe: Arc<CursorProbe>,
}

impl ScriptedExecutor {
    pub fn new(columns: &[&str], rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
            reject_with: None,
            fail_at_row: None,
            probe: Arc::new(CursorProbe::default()),
        }
    }
}

impl QueryExecutor for ScriptedExecutor {
    fn execute(
        &mut self,
        statement: &str,
        _params: &[SqlValue],
        cancel: &CancellationToken,
    ) -> Result<Box<dyn RowCursor + '_>> {
        self.probe.executions.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.reject_with {
            return Err(Error::execution(statement, message));
        }
        Ok(Box::new(ScriptedCursor {
            executor: self,
            next: 0,
            cancel: cancel.clone(),
        }))
    }
}

struct ScriptedCursor<'a> {
    executor: &'a ScriptedExecutor,
    next: usize,
    cancel: CancellationToken,
}

impl RowCursor for ScriptedCursor<'_> {
    fn advance(&mut self) -> Result<bool> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if self.executor.fail_at_row == Some(self.next) {
            return Err(Error::Decode {
                column: None,
                message: "connection reset by peer".to_string(),
            });
        }
        if self.next >= self.executor.rows.len() {
            return Ok(false);
        }
        self.next += 1;
        self.executor.probe.rows_fetched.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    fn column_names(&self) -> Result<Vec<String>> {
        self.executor
            .probe
            .column_name_calls
            .fetch_add(1, Ordering::SeqCst);
        Ok(self.executor.columns.clone())
    }

    fn scan_into(&mut self, holders: &mut [ScanHolder]) -> Result<()> {
        let row = &self.executor.rows[self.next - 1];
        for (i, (holder, value)) in holders.iter_mut().zip(row).enumerate() {
            holder.scan(i, value.as_value_ref())?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.executor.probe.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
