//! Error types for the memory crate.

use thiserror::Error;

/// Errors that can occur in the memory crate.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Database connection or operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An operation was attempted before `open`.
    #[error("Vector store is not open")]
    NotOpen,

    /// Vector length does not match the store's embedding dimension.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the store was opened with.
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },

    /// The store path could not be resolved or created.
    #[error("Invalid store path '{path}': {message}")]
    InvalidPath {
        /// The path as given.
        path: String,
        /// What went wrong.
        message: String,
    },

    /// Invalid data or state.
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type alias for memory operations.
pub type Result<T> = std::result::Result<T, MemoryError>;
