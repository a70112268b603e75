//! Memory manager configuration and defaults.

use std::path::Path;
use std::time::Duration;

use hippo_embed::SharedTransport;
use hippo_memory::{DEFAULT_CHUNK_TOKENS, DEFAULT_OVERLAP_TOKENS, SANDBOX_PREFIX};

/// Default embedding dimension.
pub const DEFAULT_DIMENSIONS: usize = 1536;
/// Default agent (tenant) identifier.
pub const DEFAULT_AGENT_ID: &str = "main";
/// Default store path, relative to the sandbox root.
pub const DEFAULT_STORE_PATH: &str = "memory-db";
/// Default number of memories injected by recall.
pub const DEFAULT_RECALL_LIMIT: usize = 3;
/// Default minimum similarity for recall.
pub const DEFAULT_RECALL_MIN_SCORE: f32 = 0.3;
/// Default maximum capture length in characters.
pub const DEFAULT_CAPTURE_MAX_CHARS: usize = 500;
/// Default similarity at or above which new content is a duplicate.
pub const DEFAULT_DUPLICATE_THRESHOLD: f32 = 0.95;

/// Deadline for the embedding step of recall.
pub const RECALL_EMBED_TIMEOUT: Duration = Duration::from_secs(3);
/// Prompts shorter than this (in characters) skip recall.
pub const MIN_RECALL_PROMPT_CHARS: usize = 5;
/// Importance recorded on conversational memories.
pub const DEFAULT_IMPORTANCE: f32 = 0.7;

/// Configuration for a [`MemoryManager`](crate::MemoryManager).
#[derive(Clone)]
pub struct MemoryManagerConfig {
    /// Embedding dimension used for every vector in the store.
    pub dimensions: usize,
    /// Store location. Relative paths are resolved inside the sandbox.
    pub store_path: String,
    /// Agent (tenant) the entries belong to.
    pub agent_id: String,
    /// Remote embedding credential. `None` selects the local embedder.
    pub api_key: Option<String>,
    /// Inject relevant memories before each turn.
    pub auto_recall: bool,
    /// Store memorable statements automatically.
    pub auto_capture: bool,
    /// Number of memories considered by recall.
    pub recall_limit: usize,
    /// Minimum similarity for recall and file search.
    pub recall_min_score: f32,
    /// Longest text eligible for capture, in characters.
    pub capture_max_chars: usize,
    /// Similarity at or above which content is a duplicate.
    pub duplicate_threshold: f32,
    /// Chunk size for file indexing, in tokens.
    pub chunk_tokens: usize,
    /// Overlap between file chunks, in tokens.
    pub chunk_overlap_tokens: usize,
    /// Transport for remote embedding calls.
    pub transport: Option<SharedTransport>,
}

impl Default for MemoryManagerConfig {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_DIMENSIONS,
            store_path: DEFAULT_STORE_PATH.to_string(),
            agent_id: DEFAULT_AGENT_ID.to_string(),
            api_key: None,
            auto_recall: true,
            auto_capture: true,
            recall_limit: DEFAULT_RECALL_LIMIT,
            recall_min_score: DEFAULT_RECALL_MIN_SCORE,
            capture_max_chars: DEFAULT_CAPTURE_MAX_CHARS,
            duplicate_threshold: DEFAULT_DUPLICATE_THRESHOLD,
            chunk_tokens: DEFAULT_CHUNK_TOKENS,
            chunk_overlap_tokens: DEFAULT_OVERLAP_TOKENS,
            transport: None,
        }
    }
}

impl std::fmt::Debug for MemoryManagerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryManagerConfig")
            .field("dimensions", &self.dimensions)
            .field("store_path", &self.store_path)
            .field("agent_id", &self.agent_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("auto_recall", &self.auto_recall)
            .field("auto_capture", &self.auto_capture)
            .field("recall_limit", &self.recall_limit)
            .field("recall_min_score", &self.recall_min_score)
            .field("capture_max_chars", &self.capture_max_chars)
            .field("duplicate_threshold", &self.duplicate_threshold)
            .field("chunk_tokens", &self.chunk_tokens)
            .field("chunk_overlap_tokens", &self.chunk_overlap_tokens)
            .field("transport", &self.transport.is_some())
            .finish()
    }
}

impl MemoryManagerConfig {
    /// Set the remote embedding credential.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the transport used for remote embedding calls.
    pub fn with_transport(mut self, transport: SharedTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set the embedding dimension.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Set the store path.
    pub fn with_store_path(mut self, store_path: impl Into<String>) -> Self {
        self.store_path = store_path.into();
        self
    }

    /// Set the agent identifier.
    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = agent_id.into();
        self
    }

    /// Toggle automatic recall and capture.
    pub fn with_auto(mut self, recall: bool, capture: bool) -> Self {
        self.auto_recall = recall;
        self.auto_capture = capture;
        self
    }

    /// Fill blank values with defaults and normalize the store path.
    pub fn resolved(mut self) -> Self {
        if self.store_path.trim().is_empty() {
            self.store_path = DEFAULT_STORE_PATH.to_string();
        }
        self.store_path = normalize_store_path(&self.store_path);
        if self.agent_id.trim().is_empty() {
            self.agent_id = DEFAULT_AGENT_ID.to_string();
        }
        if self.api_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            self.api_key = None;
        }
        if self.recall_limit == 0 {
            self.recall_limit = DEFAULT_RECALL_LIMIT;
        }
        if self.capture_max_chars == 0 {
            self.capture_max_chars = DEFAULT_CAPTURE_MAX_CHARS;
        }
        if self.chunk_tokens == 0 {
            self.chunk_tokens = DEFAULT_CHUNK_TOKENS;
        }
        self
    }
}

/// Tag relative store paths with the sandbox marker.
///
/// Absolute and already-tagged paths are returned unchanged.
pub fn normalize_store_path(path: &str) -> String {
    if path.starts_with(SANDBOX_PREFIX) || Path::new(path).is_absolute() {
        path.to_string()
    } else {
        format!("{}{}", SANDBOX_PREFIX, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MemoryManagerConfig::default();
        assert_eq!(config.dimensions, 1536);
        assert_eq!(config.agent_id, "main");
        assert!(config.auto_recall && config.auto_capture);
        assert_eq!(config.recall_limit, 3);
        assert_eq!(config.chunk_tokens, 400);
        assert_eq!(config.chunk_overlap_tokens, 80);
    }

    #[test]
    fn test_normalize_store_path() {
        assert_eq!(normalize_store_path("memory-db"), "sandbox://memory-db");
        assert_eq!(normalize_store_path("sandbox://x"), "sandbox://x");
        assert_eq!(normalize_store_path("/var/lib/hippo"), "/var/lib/hippo");
    }

    #[test]
    fn test_resolved_fills_blanks() {
        let config = MemoryManagerConfig {
            store_path: " ".into(),
            agent_id: String::new(),
            api_key: Some(String::new()),
            recall_limit: 0,
            ..Default::default()
        }
        .resolved();
        assert_eq!(config.store_path, "sandbox://memory-db");
        assert_eq!(config.agent_id, "main");
        assert!(config.api_key.is_none());
        assert_eq!(config.recall_limit, DEFAULT_RECALL_LIMIT);
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = MemoryManagerConfig::default().with_api_key("sk-secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("REDACTED"));
    }
}
