//! Storage error types

use thiserror::Error;

/// Errors that can occur during ledger storage operations
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Record with this key already exists
    #[error("record already exists: {0}")]
    AlreadyExists(String),

    /// Record not found
    #[error("record not found: {0}")]
    NotFound(String),

    /// Write would break a store invariant
    #[error("invalid ledger data: {0}")]
    InvalidData(String),

    /// Storage backend error (filesystem, remote ledger, etc.)
    #[error("storage backend error: {0}")]
    Backend(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;
