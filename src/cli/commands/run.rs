use super::config::{LoggingConfig, MonitorArgs};
use clap::Args;

#[derive(Debug, Args)]
pub struct RunCommand {
    #[command(flatten)]
    pub monitor: MonitorArgs,

    /// Seconds between runs of each query
    #[arg(long = "interval", value_name = "SECS")]
    pub interval: Option<u64>,

    #[command(flatten)]
    pub logging: LoggingConfig,
}
