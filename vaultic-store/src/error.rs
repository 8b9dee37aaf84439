//! Error types for store collaborators.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by document/blob store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend failure (connection, I/O, lock).
    #[error("store backend error: {0}")]
    Backend(String),

    /// Reference allocation failed (e.g. randomness source unusable).
    #[error("reference allocation failed: {0}")]
    RefAllocation(String),

    /// Document payload could not be serialized/deserialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
