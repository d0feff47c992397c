use crate::config::ConfigOverrides;
use clap::Args;
use std::path::PathBuf;

/// Logging configuration that can be set via CLI or env vars
#[derive(Debug, Clone, Default, Args)]
pub struct LoggingConfig {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long = "log-level", env = "SQLMETRICS_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log filter directives
    #[arg(long = "log-filter", env = "SQLMETRICS_LOG_FILTER")]
    pub log_filter: Option<String>,
}

impl LoggingConfig {
    pub fn get_effective_level(&self) -> &str {
        match (self.verbose, self.log_level.as_deref()) {
            (v, _) if v >= 2 => "trace",
            (1, _) => "debug",
            (0, Some(level)) => level,
            _ => "info",
        }
    }
}

/// Options shared by every command that loads a monitor configuration
#[derive(Debug, Clone, Default, Args)]
pub struct MonitorArgs {
    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE", env = "SQLMETRICS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database connection string (overrides the configuration file)
    #[arg(long = "connection", value_name = "CONN")]
    pub connection: Option<String>,

    /// Log the decoded contents of every result row
    #[arg(long = "log-queries")]
    pub log_queries: bool,
}

impl MonitorArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            interval_secs: None,
            log_queries: self.log_queries.then_some(true),
            connection: self.connection.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_beats_configured_level() {
        let mut logging = LoggingConfig {
            verbose: 0,
            log_level: Some("warn".to_string()),
            log_filter: None,
        };
        assert_eq!(logging.get_effective_level(), "warn");
        logging.verbose = 1;
        assert_eq!(logging.get_effective_level(), "debug");
        logging.verbose = 3;
        assert_eq!(logging.get_effective_level(), "trace");
    }
}
