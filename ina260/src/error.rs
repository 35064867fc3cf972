//! Common error types for the ina260 crate.
//!
//! This module provides a centralized Error enum using thiserror,
//! with conversions from underlying error types used throughout the crate.

use thiserror::Error;

use crate::hw_trait::HwError;

/// Main error type for the monitor and command-line tools.
#[derive(Error, Debug)]
pub enum Error {
    /// Hardware communication errors
    #[error("Hardware error: {0}")]
    Hardware(#[from] HwError),

    /// I/O errors from tokio or std
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Configuration parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Background task failed to complete
    #[error("Task error: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Convenience type alias for Results using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
