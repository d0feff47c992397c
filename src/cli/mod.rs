//! Command-line interface module.
//!
//! This module provides the CLI functionality for:
//! - Running the monitor on its schedule
//! - One-shot checks of a query configuration

pub mod commands;
pub mod handlers;

pub use handlers::{handle_check, handle_run};
