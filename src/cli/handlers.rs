use crate::cli::commands::{CheckCommand, RunCommand};
use crate::config::MonitorConfig;
use crate::metrics::{ChannelSink, EventSink, MetricEvent};
use crate::monitor::Monitor;
use anyhow::{Context, Result};
use chrono::Utc;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

fn write_event(out: &mut impl Write, event: MetricEvent) -> Result<()> {
    let event = match event.timestamp {
        Some(_) => event,
        None => event.with_timestamp(Utc::now()),
    };
    serde_json::to_writer(&mut *out, &event).context("Failed to serialize event")?;
    writeln!(out).context("Failed to write event")?;
    Ok(())
}

pub async fn handle_run(cmd: RunCommand) -> Result<()> {
    let mut overrides = cmd.monitor.overrides();
    overrides.interval_secs = cmd.interval;
    let config = MonitorConfig::load(cmd.monitor.config.as_deref(), &overrides)
        .context("Failed to load configuration")?;
    let monitor = Monitor::new(config).context("Invalid configuration")?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let sink: Arc<dyn EventSink> = Arc::new(ChannelSink::new(tx));
    let shutdown = CancellationToken::new();

    let writer = tokio::spawn(async move {
        let stdout = std::io::stdout();
        while let Some(event) = rx.recv().await {
            if let Err(e) = write_event(&mut stdout.lock(), event) {
                error!(error = %e, "Failed to write event");
            }
        }
    });

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received interrupt, shutting down");
        }
        signal_token.cancel();
    });

    monitor.run(sink, shutdown).await?;
    // The monitor's sink handles are gone; the writer drains and exits.
    writer.await.context("Event writer task failed")?;
    Ok(())
}

pub fn handle_check(cmd: CheckCommand) -> Result<()> {
    let config = MonitorConfig::load(cmd.monitor.config.as_deref(), &cmd.monitor.overrides())
        .context("Failed to load configuration")?;
    let monitor = Monitor::new(config).context("Invalid configuration")?;

    let quiet = cmd.quiet;
    let stdout = std::io::stdout();
    let sink = move |event: MetricEvent| {
        if quiet {
            return;
        }
        if let Err(e) = write_event(&mut stdout.lock(), event) {
            error!(error = %e, "Failed to write event");
        }
    };

    let mut failures = 0;
    for (statement, result) in monitor.run_once(&sink)? {
        match result {
            Ok(stats) => eprintln!(
                "ok    {}: {} rows, {} events emitted, {} dropped",
                statement, stats.rows, stats.emitted, stats.dropped
            ),
            Err(e) => {
                failures += 1;
                eprintln!("error {}: {}", statement, e);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of the configured queries failed", failures);
    }
    Ok(())
}
