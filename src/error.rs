//! Error types for the SQL metrics engine.
//!
//! Errors fall into two categories. Recoverable errors (`Execution`, `Config`,
//! `Decode`, `Cancelled`, `Io`) stop the current run of a query and are retried
//! on the next scheduled attempt. `Internal` marks a defect in the engine itself
//! and is never produced by valid configuration or data; see [`Error::is_defect`].

use std::error::Error as StdError;
use std::fmt;
use std::result;

/// A specialized Result type for engine operations.
pub type Result<T> = result::Result<T, Error>;

/// The error type for engine operations.
#[derive(Debug)]
pub enum Error {
    /// The statement was rejected or the connection failed
    Execution { statement: String, message: String },
    /// Configuration errors, including declared label columns missing from results
    Config(String),
    /// A row could not be scanned into its holders
    Decode { column: Option<usize>, message: String },
    /// The surrounding execution context was cancelled
    Cancelled,
    /// I/O errors
    Io(std::io::Error),
    /// Classifier and decoder disagree about the column layout.
    ///
    /// This is an engine defect, not a user error.
    Internal(String),
}

impl Error {
    pub fn execution(statement: impl Into<String>, message: impl fmt::Display) -> Self {
        Error::Execution {
            statement: statement.into(),
            message: message.to_string(),
        }
    }

    pub fn decode(column: usize, message: impl Into<String>) -> Self {
        Error::Decode {
            column: Some(column),
            message: message.into(),
        }
    }

    /// Returns true when the error signals an engine defect rather than a
    /// configuration, data or runtime problem.
    pub fn is_defect(&self) -> bool {
        matches!(self, Error::Internal(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Execution { statement, message } => {
                write!(f, "error executing statement {}: {}", statement, message)
            }
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Decode {
                column: Some(column),
                message,
            } => write!(f, "Decode error in column {}: {}", column, message),
            Error::Decode {
                column: None,
                message,
            } => write!(f, "Decode error: {}", message),
            Error::Cancelled => write!(f, "Query execution cancelled"),
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}
