use super::config::{LoggingConfig, MonitorArgs};
use clap::Args;

#[derive(Debug, Args)]
pub struct CheckCommand {
    #[command(flatten)]
    pub monitor: MonitorArgs,

    /// Print statistics only, not the emitted events
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    #[command(flatten)]
    pub logging: LoggingConfig,
}
