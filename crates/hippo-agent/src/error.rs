//! Error types for the agent crate.

use thiserror::Error;

/// Result type alias using the agent error type.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Error type for memory manager and tool operations.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Embedding generation failed.
    #[error("Embedding error: {0}")]
    Embed(#[from] hippo_embed::EmbedError),

    /// Vector store operation failed.
    #[error("Memory store error: {0}")]
    Memory(#[from] hippo_memory::MemoryError),

    /// The manager has not been initialized.
    #[error("Memory manager is not initialized")]
    NotInitialized,

    /// Content was rejected as a likely prompt injection.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// A file could not be read or listed.
    #[error("File error: {0}")]
    File(String),

    /// Tool not found in registry.
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Invalid tool parameters.
    #[error("Invalid tool parameters: {0}")]
    InvalidToolParams(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AgentError {
    /// Create a file error.
    pub fn file(msg: impl Into<String>) -> Self {
        Self::File(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AgentError::file("MEMORY.md: not found");
        assert!(err.to_string().contains("File error"));
        assert!(err.to_string().contains("MEMORY.md"));
    }

    #[test]
    fn test_from_memory_error() {
        let err: AgentError = hippo_memory::MemoryError::NotOpen.into();
        assert!(matches!(err, AgentError::Memory(_)));
        assert!(err.to_string().contains("not open"));
    }

    #[test]
    fn test_not_initialized_display() {
        assert_eq!(
            AgentError::NotInitialized.to_string(),
            "Memory manager is not initialized"
        );
    }
}
