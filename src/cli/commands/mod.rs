pub mod check;
pub mod config;
pub mod run;

pub use check::CheckCommand;
pub use config::{LoggingConfig, MonitorArgs};
pub use run::RunCommand;

use clap::Subcommand;

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the configured queries on their interval until interrupted
    Run(RunCommand),
    /// Run every configured query once and print the resulting events
    Check(CheckCommand),
}

impl Commands {
    pub fn logging(&self) -> &LoggingConfig {
        match self {
            Commands::Run(cmd) => &cmd.logging,
            Commands::Check(cmd) => &cmd.logging,
        }
    }
}
