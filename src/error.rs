//! Error types for portmapp.
//!
//! Uses `thiserror` for ergonomic error definitions. Network conditions met
//! while probing are never errors; they are reported as port status.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::PortError;

/// Misuse of the scan controller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("a scan is already in progress")]
    InvalidState,

    #[error("no scan request configured")]
    NotConfigured,
}

/// Result type alias for scan controller operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors while loading or saving settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine configuration directory")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("invalid settings format: {0}")]
    InvalidFormat(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidFormat(e.to_string())
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors surfaced by the command-line front-end.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Port(#[from] PortError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type CliResult<T> = Result<T, CliError>;
