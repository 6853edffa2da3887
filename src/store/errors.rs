//! # Store Errors
//!
//! Error types for the document store contract.

use thiserror::Error;

use super::document::Collection;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Document store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store request failed or timed out
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Update targeted a document that does not exist
    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: Collection, id: String },

    /// Create targeted an id that is already taken
    #[error("Document already exists: {collection}/{id}")]
    AlreadyExists { collection: Collection, id: String },

    /// A batch precondition did not hold at commit time
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// Stored data could not be decoded into a record
    #[error("Malformed document: {0}")]
    Malformed(String),
}

impl StoreError {
    /// Shorthand for a missing document
    pub fn not_found(collection: Collection, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection,
            id: id.into(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}
