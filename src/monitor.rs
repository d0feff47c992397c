//! Scheduling of configured queries.
//!
//! Every configured query gets its own task, querier and database connection.
//! Queriers run on the blocking pool since rows are pulled synchronously.

use crate::config::MonitorConfig;
use crate::error::{Error, Result};
use crate::metrics::EventSink;
use crate::query::{Querier, RunStats};
use crate::storage::DuckDbExecutor;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub struct Monitor {
    config: MonitorConfig,
}

impl Monitor {
    pub fn new(config: MonitorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Open one connection per query against the configured database.
    ///
    /// The returned primary connection owns the database and must outlive the
    /// per-query connections.
    fn open_queriers(&self) -> Result<(DuckDbExecutor, Vec<(Querier, DuckDbExecutor)>)> {
        let primary = DuckDbExecutor::from_config(&self.config.database)?;
        let queriers = self
            .config
            .queries
            .iter()
            .map(|spec| {
                let executor = primary.try_clone()?;
                Ok((Querier::new(Arc::new(spec.clone()), self.config.log_queries), executor))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((primary, queriers))
    }

    /// Run every query once, sequentially.
    pub fn run_once(&self, sink: &dyn EventSink) -> Result<Vec<(String, Result<RunStats>)>> {
        let cancel = CancellationToken::new();
        let (_primary, queriers) = self.open_queriers()?;
        Ok(queriers
            .into_iter()
            .map(|(mut querier, mut executor)| {
                let result = querier.run(&mut executor, sink, &cancel);
                (querier.spec().statement.clone(), result)
            })
            .collect())
    }

    /// Run every query on the configured interval until `shutdown` is cancelled.
    pub async fn run(self, sink: Arc<dyn EventSink>, shutdown: CancellationToken) -> Result<()> {
        let (primary, queriers) = self.open_queriers()?;
        let interval = self.config.interval();
        info!(
            queries = queriers.len(),
            interval_secs = self.config.interval_secs,
            "Starting SQL metrics monitor"
        );

        let mut tasks = JoinSet::new();
        for (querier, executor) in queriers {
            tasks.spawn(drive(
                querier,
                executor,
                sink.clone(),
                interval,
                shutdown.clone(),
            ));
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Query task terminated abnormally");
            }
        }
        drop(primary);
        info!("SQL metrics monitor stopped");
        Ok(())
    }
}

async fn drive(
    mut querier: Querier,
    mut executor: DuckDbExecutor,
    sink: Arc<dyn EventSink>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let statement = querier.spec().statement.clone();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let sink = sink.clone();
        let cancel = shutdown.child_token();
        let handle = tokio::task::spawn_blocking(move || {
            let result = querier.run(&mut executor, sink.as_ref(), &cancel);
            (querier, executor, result)
        });

        let result = match handle.await {
            Ok((q, e, result)) => {
                querier = q;
                executor = e;
                result
            }
            Err(e) => {
                error!(statement = %statement, error = %e, "Query run panicked, not rescheduling");
                return;
            }
        };

        match result {
            Ok(stats) => debug!(
                statement = %statement,
                rows = stats.rows,
                emitted = stats.emitted,
                dropped = stats.dropped,
                "Query run complete"
            ),
            Err(Error::Cancelled) => break,
            Err(err) if err.is_defect() => {
                error!(statement = %statement, error = %err, "Internal error, not rescheduling query");
                return;
            }
            Err(err) => warn!(statement = %statement, error = %err, "Query run failed"),
        }
    }
    debug!(statement = %statement, "Query task shut down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricEvent;
    use parking_lot::Mutex;

    fn config(toml: &str) -> MonitorConfig {
        MonitorConfig::from_toml_str(toml).unwrap()
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        assert!(Monitor::new(config("")).is_err());
    }

    #[test]
    fn run_once_reports_each_query() {
        let monitor = Monitor::new(config(
            r#"
            [database]
            setup = ["CREATE TABLE t (host VARCHAR, v DOUBLE)", "INSERT INTO t VALUES ('a', 1.0), ('b', 2.0)"]

            [[queries]]
            statement = "SELECT host, v FROM t ORDER BY host"
            [[queries.metrics]]
            name = "v"
            value_column = "v"
            label_columns = ["host"]

            [[queries]]
            statement = "SELECT v FROM t"
            [[queries.metrics]]
            name = "v"
            value_column = "v"
            label_columns = ["nope"]
            "#,
        ))
        .unwrap();

        let events = Mutex::new(Vec::<MetricEvent>::new());
        let sink = |event: MetricEvent| events.lock().push(event);
        let results = monitor.run_once(&sink).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].1.as_ref().unwrap().emitted, 2);
        assert!(matches!(results[1].1, Err(Error::Config(_))));
        assert_eq!(events.lock().len(), 2);
    }
}
