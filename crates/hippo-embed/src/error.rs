//! Error types for the embeddings crate.

use std::time::Duration;
use thiserror::Error;

/// Result type alias using the embedding error type.
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Errors that can occur while generating embeddings.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// Invalid configuration (missing key, zero dimensions, ...).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The transport failed to deliver the request.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The request did not complete before its deadline.
    #[error("Embedding request timed out after {0:?}")]
    Timeout(Duration),

    /// The provider answered with an HTTP error status.
    #[error("Embedding request failed: HTTP {status} - {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body (possibly truncated).
        body: String,
    },

    /// The provider returned an `error` object in its response body.
    #[error("Embedding provider error: {0}")]
    Provider(String),

    /// The response could not be parsed or carried no vector.
    #[error("Invalid embedding response: {0}")]
    InvalidResponse(String),

    /// The returned vector does not have the configured dimension.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Configured dimension.
        expected: usize,
        /// Dimension of the returned vector.
        actual: usize,
    },
}

impl EmbedError {
    /// Whether this error came from the network layer rather than the provider.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }
}

impl From<reqwest::Error> for EmbedError {
    fn from(err: reqwest::Error) -> Self {
        EmbedError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for EmbedError {
    fn from(err: serde_json::Error) -> Self {
        EmbedError::InvalidResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EmbedError::Http {
            status: 401,
            body: "unauthorized".to_string(),
        };
        assert!(err.to_string().contains("HTTP 401"));
        assert!(err.to_string().contains("unauthorized"));
    }

    #[test]
    fn test_is_transport() {
        assert!(EmbedError::Timeout(Duration::from_secs(1)).is_transport());
        assert!(EmbedError::Transport("reset".into()).is_transport());
        assert!(!EmbedError::Provider("bad key".into()).is_transport());
    }
}
