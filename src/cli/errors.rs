//! CLI errors
//!
//! These end the process. Per-request failures are reported on stdout and
//! do not stop the request loop.

use std::io;

use thiserror::Error;

/// Failures of the `folio` binary itself
#[derive(Debug, Error)]
pub enum CliError {
    #[error("FOLIO_CLI_CONFIG_ERROR: {0}")]
    Config(String),

    /// stdin/stdout failure or unreadable request line
    #[error("FOLIO_CLI_IO_ERROR: {0}")]
    Io(String),

    #[error("FOLIO_CLI_ALREADY_INITIALIZED: {0}")]
    AlreadyInitialized(String),

    /// Tokio runtime could not start
    #[error("FOLIO_CLI_BOOT_FAILED: {0}")]
    BootFailed(String),

    /// Line is JSON but not a known operation
    #[error("FOLIO_CLI_INVALID_REQUEST: {0}")]
    InvalidRequest(String),
}

impl CliError {
    pub fn already_initialized(path: &std::path::Path) -> Self {
        CliError::AlreadyInitialized(format!("configuration already exists at {}", path.display()))
    }

    pub fn code(&self) -> &'static str {
        match self {
            CliError::Config(_) => "FOLIO_CLI_CONFIG_ERROR",
            CliError::Io(_) => "FOLIO_CLI_IO_ERROR",
            CliError::AlreadyInitialized(_) => "FOLIO_CLI_ALREADY_INITIALIZED",
            CliError::BootFailed(_) => "FOLIO_CLI_BOOT_FAILED",
            CliError::InvalidRequest(_) => "FOLIO_CLI_INVALID_REQUEST",
        }
    }

    /// Message without the code prefix
    pub fn message(&self) -> &str {
        match self {
            CliError::Config(m)
            | CliError::Io(m)
            | CliError::AlreadyInitialized(m)
            | CliError::BootFailed(m)
            | CliError::InvalidRequest(m) => m,
        }
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Io(format!("JSON error: {}", e))
    }
}

pub type CliResult<T> = Result<T, CliError>;
