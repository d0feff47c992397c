//! sqlmetrics binary.
//!
//! Runs configured SQL queries on a schedule and emits one metric event per
//! declared metric for every result row.

use clap::Parser;
use sqlmetrics_core::cli::{commands::Commands, handle_check, handle_run};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logging = cli.command.logging();
    let level = logging.get_effective_level();

    // Events go to stdout, diagnostics to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.parse().unwrap_or(Level::INFO).into())
                .parse_lossy(logging.log_filter.as_deref().unwrap_or("")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    info!("sqlmetrics starting up");

    match cli.command {
        Commands::Run(cmd) => handle_run(cmd).await?,
        Commands::Check(cmd) => tokio::task::spawn_blocking(move || handle_check(cmd)).await??,
    }

    Ok(())
}
