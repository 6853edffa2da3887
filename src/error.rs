//! # Folio Errors
//!
//! Error kinds surfaced by the chapter/version operations.
//!
//! Failures are returned to the caller as-is. Nothing here retries or
//! repairs state: a failed batch has no visible effects and the caller may
//! re-run the whole logical operation.

use thiserror::Error;

use crate::store::StoreError;

/// Result type for chapter/version operations
pub type FolioResult<T> = Result<T, FolioError>;

/// Chapter/version operation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FolioError {
    /// Referenced chapter or version does not exist, or no current version
    /// exists where one was required
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation would break an invariant (e.g. deleting the current version)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Optimistic concurrency token was stale at commit time
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The underlying store failed or timed out
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A stored record could not be decoded
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl FolioError {
    /// Create a not found error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create an invalid operation error
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "FOLIO_NOT_FOUND",
            Self::InvalidOperation(_) => "FOLIO_INVALID_OPERATION",
            Self::Conflict(_) => "FOLIO_CONFLICT",
            Self::StoreUnavailable(_) => "FOLIO_STORE_UNAVAILABLE",
            Self::Corrupt(_) => "FOLIO_CORRUPT_RECORD",
        }
    }

    /// Whether re-running the whole operation may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::StoreUnavailable(_))
    }
}

impl From<StoreError> for FolioError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => Self::StoreUnavailable(msg),
            StoreError::NotFound { collection, id } => {
                Self::NotFound(format!("{} record {}", collection, id))
            }
            StoreError::AlreadyExists { collection, id } => {
                Self::InvalidOperation(format!("{} record {} already exists", collection, id))
            }
            StoreError::PreconditionFailed(msg) => Self::Conflict(msg),
            StoreError::Malformed(msg) => Self::Corrupt(msg),
        }
    }
}
