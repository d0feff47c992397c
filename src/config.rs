//! Configuration management for the SQL metrics monitor.
//!
//! Configuration is loaded from multiple sources, later ones overriding
//! earlier ones:
//! 1. Default configuration (embedded in binary)
//! 2. User-specified configuration file
//! 3. Environment variables (prefixed with `SQLMETRICS__`, `__` separating nested keys)
//! 4. Command-line arguments
//!
//! # Environment Variables
//!
//! - `SQLMETRICS__INTERVAL_SECS` - Seconds between runs of each query
//! - `SQLMETRICS__LOG_QUERIES` - Log the decoded contents of every row
//! - `SQLMETRICS__DATABASE__CONNECTION` - Database connection string

use crate::error::{Error, Result};
use crate::query::QuerySpec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Database connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver; only "duckdb" is supported
    #[serde(default = "default_driver")]
    pub driver: String,
    /// Connection string (`:memory:` or a database file path)
    #[serde(default = "default_connection")]
    pub connection: String,
    /// Statements executed once after connecting
    #[serde(default)]
    pub setup: Vec<String>,
    /// DuckDB configuration options applied when opening, e.g. `threads`
    #[serde(default)]
    pub options: HashMap<String, String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            connection: default_connection(),
            setup: Vec::new(),
            options: HashMap::new(),
        }
    }
}

/// Monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Seconds between runs of each query
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Log the decoded contents of every row
    #[serde(default)]
    pub log_queries: bool,
    #[serde(default)]
    pub queries: Vec<QuerySpec>,
}

/// Values given on the command line, applied after all other sources.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub interval_secs: Option<u64>,
    pub log_queries: Option<bool>,
    pub connection: Option<String>,
}

impl MonitorConfig {
    /// Load configuration from all sources
    pub fn load(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml));

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("SQLMETRICS")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: MonitorConfig = builder.build()?.try_deserialize()?;
        config.apply(overrides);
        Ok(config)
    }

    /// Parse a TOML document layered over the built-in defaults.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(interval) = overrides.interval_secs {
            self.interval_secs = interval;
        }
        if let Some(log_queries) = overrides.log_queries {
            self.log_queries = log_queries;
        }
        if let Some(connection) = &overrides.connection {
            self.database.connection = connection.clone();
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Check the configuration for errors that don't need a database to detect.
    pub fn validate(&self) -> Result<()> {
        if !self.database.driver.eq_ignore_ascii_case("duckdb") {
            return Err(Error::Config(format!(
                "unsupported database driver '{}'",
                self.database.driver
            )));
        }
        if self.interval_secs == 0 {
            return Err(Error::Config("interval_secs must be greater than zero".to_string()));
        }
        if self.queries.is_empty() {
            return Err(Error::Config("no queries configured".to_string()));
        }
        for (i, query) in self.queries.iter().enumerate() {
            if query.statement.trim().is_empty() {
                return Err(Error::Config(format!("query {} has an empty statement", i)));
            }
            if query.metrics.is_empty() {
                return Err(Error::Config(format!(
                    "query {} ({}) declares no metrics",
                    i, query.statement
                )));
            }
            for metric in &query.metrics {
                if metric.name.trim().is_empty() {
                    return Err(Error::Config(format!(
                        "query {} has a metric without a name",
                        i
                    )));
                }
                if metric.value_column.trim().is_empty() {
                    return Err(Error::Config(format!(
                        "metric '{}' has no value column",
                        metric.name
                    )));
                }
            }
        }
        Ok(())
    }
}

fn default_driver() -> String {
    "duckdb".to_string()
}

fn default_connection() -> String {
    ":memory:".to_string()
}

fn default_interval_secs() -> u64 {
    10
}
