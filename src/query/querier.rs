//! Drives one configured query: execute, decode each row, emit events.

use crate::error::{Error, Result};
use crate::metrics::EventSink;
use crate::query::assembler::EventAssembler;
use crate::query::classifier::ColumnLayout;
use crate::query::decoder::RowDecoder;
use crate::query::spec::QuerySpec;
use crate::storage::{QueryExecutor, RowCursor};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn};

/// Counters for a single run of a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Rows fetched from the cursor
    pub rows: usize,
    /// Events assembled (rows times metrics)
    pub candidates: usize,
    /// Events handed to the sink
    pub emitted: usize,
    /// Events skipped because their value column was null or absent
    pub dropped: usize,
}

/// Runs one query repeatedly, caching its column layout and scan buffer.
///
/// The layout is classified from the first row ever fetched and trusted for
/// the life of the querier. A querier is owned by exactly one task; nothing
/// in it is shared with other queriers.
#[derive(Debug)]
pub struct Querier {
    spec: Arc<QuerySpec>,
    log_queries: bool,
    assembler: EventAssembler,
    decoder: Option<RowDecoder>,
}

impl Querier {
    pub fn new(spec: Arc<QuerySpec>, log_queries: bool) -> Self {
        let assembler = EventAssembler::new(&spec);
        Self {
            spec,
            log_queries,
            assembler,
            decoder: None,
        }
    }

    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    /// The cached column layout, once the first row has been classified.
    pub fn layout(&self) -> Option<&ColumnLayout> {
        self.decoder.as_ref().map(RowDecoder::layout)
    }

    /// Execute the query and forward every well-formed event to `sink`.
    ///
    /// Events already sent are not retracted when a later row fails.
    pub fn run(
        &mut self,
        executor: &mut dyn QueryExecutor,
        sink: &dyn EventSink,
        cancel: &CancellationToken,
    ) -> Result<RunStats> {
        let span = info_span!("sql_query", statement = %self.spec.statement);
        let _enter = span.enter();

        let mut cursor = executor.execute(&self.spec.statement, &self.spec.params, cancel)?;
        let mut stats = RunStats::default();

        match self.drain(cursor.as_mut(), sink, cancel, &mut stats) {
            Ok(()) => {
                cursor.close()?;
                Ok(stats)
            }
            Err(err) => {
                if let Err(close_err) = cursor.close() {
                    warn!(error = %close_err, "Failed to close cursor after error");
                }
                Err(err)
            }
        }
    }

    fn drain(
        &mut self,
        cursor: &mut dyn RowCursor,
        sink: &dyn EventSink,
        cancel: &CancellationToken,
        stats: &mut RunStats,
    ) -> Result<()> {
        while cursor.advance()? {
            if self.decoder.is_none() {
                let columns = cursor.column_names()?;
                let layout = ColumnLayout::classify(&columns, &self.spec)?;
                self.decoder = Some(RowDecoder::new(layout));
            }
            let decoder = self
                .decoder
                .as_mut()
                .ok_or_else(|| Error::Internal("row decoder missing after classification".to_string()))?;

            decoder.decode(cursor)?;
            if self.log_queries {
                info!(row = ?decoder.holders(), "Got results");
            }

            let events = self.assembler.assemble(decoder)?;
            stats.rows += 1;
            stats.candidates += events.len();

            for (event, metric) in events.into_iter().zip(&self.spec.metrics) {
                if cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                if event.value.is_none() {
                    warn!(
                        metric = %metric.name,
                        value_column = %metric.value_column,
                        "Metric's value column did not correspond to a value"
                    );
                    stats.dropped += 1;
                    continue;
                }
                sink.send(event);
                stats.emitted += 1;
            }
        }
        Ok(())
    }
}
