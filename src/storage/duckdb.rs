use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::query::ScanHolder;
use crate::storage::{QueryExecutor, RowCursor, SqlValue, ValueRef};
use duckdb::arrow::array::{Array, ArrayRef, AsArray, RecordBatch};
use duckdb::arrow::datatypes::{
    DataType, Decimal128Type, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type,
    UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use duckdb::arrow::util::display::array_value_to_string;
use duckdb::types::Value;
use duckdb::{params_from_iter, Config, Connection, InterruptHandle};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// DuckDB-based query executor
pub struct DuckDbExecutor {
    conn: Connection,
}

impl DuckDbExecutor {
    /// Open a connection (`:memory:` or a database file path).
    pub fn open(connection_string: &str) -> Result<Self> {
        Self::open_with_options(connection_string, &HashMap::new())
    }

    /// Open a connection with DuckDB configuration options such as `threads`
    /// or `memory_limit`.
    pub fn open_with_options(connection_string: &str, options: &HashMap<String, String>) -> Result<Self> {
        let mut config = Config::default();
        for (key, value) in options {
            config = config
                .with(key, value)
                .map_err(|e| Error::Config(format!("invalid database option {}={}: {}", key, value, e)))?;
        }

        let conn = if connection_string.is_empty() || connection_string == ":memory:" {
            Connection::open_in_memory_with_flags(config)
        } else {
            Connection::open_with_flags(connection_string, config)
        }
        .map_err(|e| Error::execution("<connect>", format!("failed to open {}: {}", connection_string, e)))?;
        Ok(Self { conn })
    }

    /// Open the configured database and run its setup statements.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        let executor = Self::open_with_options(&config.connection, &config.options)?;
        for statement in &config.setup {
            executor.execute_batch(statement)?;
        }
        Ok(executor)
    }

    /// Open another connection to the same database.
    pub fn try_clone(&self) -> Result<Self> {
        let conn = self
            .conn
            .try_clone()
            .map_err(|e| Error::execution("<connect>", format!("failed to clone connection: {}", e)))?;
        Ok(Self { conn })
    }

    /// Run statements that produce no rows (DDL, inserts).
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| Error::execution(sql, e))
    }
}

fn to_duckdb_value(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Bool(b) => Value::Boolean(*b),
        SqlValue::Int(i) => Value::BigInt(*i),
        SqlValue::Float(f) => Value::Double(*f),
        SqlValue::Text(s) => Value::Text(s.clone()),
    }
}

impl QueryExecutor for DuckDbExecutor {
    fn execute(
        &mut self,
        statement: &str,
        params: &[SqlValue],
        cancel: &CancellationToken,
    ) -> Result<Box<dyn RowCursor + '_>> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut stmt = self
            .conn
            .prepare(statement)
            .map_err(|e| Error::execution(statement, e))?;

        let guard = InterruptGuard::arm(self.conn.interrupt_handle(), cancel)?;
        let executed = stmt.query_arrow(params_from_iter(params.iter().map(to_duckdb_value)));
        drop(guard);

        // An interrupted statement surfaces as a DuckDB failure
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let batches: Vec<RecordBatch> = executed.map_err(|e| Error::execution(statement, e))?.collect();

        debug!(
            batches = batches.len(),
            rows = batches.iter().map(|b| b.num_rows()).sum::<usize>(),
            "Executed statement"
        );

        Ok(Box::new(DuckDbCursor {
            batches,
            position: None,
            cancel: cancel.clone(),
        }))
    }
}

/// Interrupts the statement running on a connection if `cancel` fires while
/// the guard is held.
struct InterruptGuard {
    done: CancellationToken,
    watcher: Option<JoinHandle<()>>,
}

impl InterruptGuard {
    fn arm(handle: Arc<InterruptHandle>, cancel: &CancellationToken) -> Result<Self> {
        let done = CancellationToken::new();
        let runtime = tokio::runtime::Builder::new_current_thread().build()?;
        let cancel = cancel.clone();
        let stop = done.clone();
        let watcher = std::thread::Builder::new()
            .name("duckdb-interrupt".to_string())
            .spawn(move || {
                runtime.block_on(async {
                    tokio::select! {
                        _ = stop.cancelled() => {}
                        _ = cancel.cancelled() => {
                            debug!("Interrupting running statement");
                            handle.interrupt();
                        }
                    }
                })
            })?;
        Ok(Self {
            done,
            watcher: Some(watcher),
        })
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        self.done.cancel();
        if let Some(watcher) = self.watcher.take() {
            let _ = watcher.join();
        }
    }
}

/// Cursor over the record batches of one executed statement.
struct DuckDbCursor {
    batches: Vec<RecordBatch>,
    /// (batch, row) of the current row
    position: Option<(usize, usize)>,
    cancel: CancellationToken,
}

impl DuckDbCursor {
    fn next_position(&self) -> Option<(usize, usize)> {
        let (mut batch, mut row) = match self.position {
            Some((batch, row)) => (batch, row + 1),
            None => (0, 0),
        };
        while let Some(current) = self.batches.get(batch) {
            if row < current.num_rows() {
                return Some((batch, row));
            }
            batch += 1;
            row = 0;
        }
        None
    }

    fn current(&self) -> Result<(&RecordBatch, usize)> {
        self.position
            .and_then(|(batch, row)| self.batches.get(batch).map(|b| (b, row)))
            .ok_or_else(|| Error::Decode {
                column: None,
                message: "scan called without a current row".to_string(),
            })
    }
}

impl RowCursor for DuckDbCursor {
    fn advance(&mut self) -> Result<bool> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        match self.next_position() {
            Some(position) => {
                self.position = Some(position);
                Ok(true)
            }
            None => {
                self.position = None;
                self.batches.clear();
                Ok(false)
            }
        }
    }

    fn column_names(&self) -> Result<Vec<String>> {
        let batch = self.batches.first().ok_or_else(|| Error::Decode {
            column: None,
            message: "column metadata requested on an exhausted cursor".to_string(),
        })?;
        Ok(batch
            .schema()
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .collect())
    }

    fn scan_into(&mut self, holders: &mut [ScanHolder]) -> Result<()> {
        let (batch, row) = self.current()?;
        if holders.len() != batch.num_columns() {
            return Err(Error::Decode {
                column: None,
                message: format!(
                    "got {} destination holders, row has {} columns",
                    holders.len(),
                    batch.num_columns()
                ),
            });
        }
        for (i, holder) in holders.iter_mut().enumerate() {
            let value = cell_value(batch.column(i), row).map_err(|message| Error::decode(i, message))?;
            holder.scan(i, value)?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.batches.clear();
        self.position = None;
        Ok(())
    }
}

/// Read one cell of an Arrow column as a scannable value.
fn cell_value(column: &ArrayRef, row: usize) -> std::result::Result<ValueRef<'_>, String> {
    if column.is_null(row) {
        return Ok(ValueRef::Null);
    }
    let value = match column.data_type() {
        DataType::Null => ValueRef::Null,
        DataType::Boolean => ValueRef::Bool(column.as_boolean().value(row)),
        DataType::Int8 => ValueRef::Int(column.as_primitive::<Int8Type>().value(row).into()),
        DataType::Int16 => ValueRef::Int(column.as_primitive::<Int16Type>().value(row).into()),
        DataType::Int32 => ValueRef::Int(column.as_primitive::<Int32Type>().value(row).into()),
        DataType::Int64 => ValueRef::Int(column.as_primitive::<Int64Type>().value(row)),
        DataType::UInt8 => ValueRef::UInt(column.as_primitive::<UInt8Type>().value(row).into()),
        DataType::UInt16 => ValueRef::UInt(column.as_primitive::<UInt16Type>().value(row).into()),
        DataType::UInt32 => ValueRef::UInt(column.as_primitive::<UInt32Type>().value(row).into()),
        DataType::UInt64 => ValueRef::UInt(column.as_primitive::<UInt64Type>().value(row)),
        DataType::Float32 => ValueRef::Float(column.as_primitive::<Float32Type>().value(row).into()),
        DataType::Float64 => ValueRef::Float(column.as_primitive::<Float64Type>().value(row)),
        DataType::Decimal128(_, scale) => {
            let raw = column.as_primitive::<Decimal128Type>().value(row);
            ValueRef::Float(raw as f64 / 10f64.powi(i32::from(*scale)))
        }
        DataType::Utf8 => ValueRef::Text(Cow::Borrowed(column.as_string::<i32>().value(row))),
        DataType::LargeUtf8 => ValueRef::Text(Cow::Borrowed(column.as_string::<i64>().value(row))),
        _ => ValueRef::Text(Cow::Owned(
            array_value_to_string(column, row).map_err(|e| e.to_string())?,
        )),
    };
    Ok(value)
}
