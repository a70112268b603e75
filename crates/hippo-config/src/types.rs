//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [memory]                 # store location, tenant, recall/capture toggles
//! [embedding]              # dimension and remote credential
//! [chunking]               # file indexing chunk sizes
//! ```

use serde::{Deserialize, Serialize};

use hippo_agent::{
    DEFAULT_AGENT_ID, DEFAULT_CAPTURE_MAX_CHARS, DEFAULT_DIMENSIONS, DEFAULT_DUPLICATE_THRESHOLD,
    DEFAULT_RECALL_LIMIT, DEFAULT_RECALL_MIN_SCORE, DEFAULT_STORE_PATH, MemoryManagerConfig,
};

use crate::ConfigError;

/// Environment variable consulted when no key is configured.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g. a project-local
/// override) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HippoConfig {
    /// Memory manager settings.
    pub memory: Option<MemorySection>,

    /// Embedding settings.
    pub embedding: Option<EmbeddingSection>,

    /// File indexing settings.
    pub chunking: Option<ChunkingSection>,
}

impl HippoConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> crate::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one. Sections present in
    /// `other` replace ours whole.
    pub fn merge(&mut self, other: HippoConfig) {
        if other.memory.is_some() {
            self.memory = other.memory;
        }
        if other.embedding.is_some() {
            self.embedding = other.embedding;
        }
        if other.chunking.is_some() {
            self.chunking = other.chunking;
        }
    }

    /// Whether an API key is written in the config itself.
    pub fn has_plaintext_api_key(&self) -> bool {
        self.embedding
            .as_ref()
            .is_some_and(|e| e.api_key.as_deref().is_some_and(|k| !k.trim().is_empty()))
    }

    /// Reject values the memory manager cannot work with.
    pub fn validate(&self) -> crate::Result<()> {
        if let Some(embedding) = &self.embedding
            && embedding.dimensions == 0
        {
            return Err(ConfigError::invalid(
                "embedding.dimensions",
                "must be greater than 0",
            ));
        }
        if let Some(memory) = &self.memory {
            for (field, value) in [
                ("memory.recall_min_score", memory.recall_min_score),
                ("memory.duplicate_threshold", memory.duplicate_threshold),
            ] {
                if !(0.0..=1.0).contains(&value) {
                    return Err(ConfigError::invalid(field, "must be between 0.0 and 1.0"));
                }
            }
        }
        if let Some(chunking) = &self.chunking
            && chunking.tokens == 0
        {
            return Err(ConfigError::invalid("chunking.tokens", "must be greater than 0"));
        }
        Ok(())
    }

    /// API key from the config, then the environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    /// API key resolution with an injectable environment lookup.
    pub fn resolve_api_key_with(
        &self,
        env: impl FnOnce(&str) -> Option<String>,
    ) -> Option<String> {
        self.embedding
            .as_ref()
            .and_then(|e| e.api_key.clone())
            .filter(|k| !k.trim().is_empty())
            .or_else(|| env(API_KEY_ENV).filter(|k| !k.trim().is_empty()))
    }

    /// Build the memory manager configuration.
    ///
    /// Missing sections take their defaults; the key is resolved through
    /// [`resolve_api_key`](Self::resolve_api_key).
    pub fn to_manager_config(&self) -> MemoryManagerConfig {
        self.to_manager_config_with_key(self.resolve_api_key())
    }

    /// Build the memory manager configuration with an already-resolved key.
    pub fn to_manager_config_with_key(&self, api_key: Option<String>) -> MemoryManagerConfig {
        let memory = self.memory.clone().unwrap_or_default();
        let embedding = self.embedding.clone().unwrap_or_default();
        let chunking = self.chunking.clone().unwrap_or_default();

        MemoryManagerConfig {
            dimensions: embedding.dimensions,
            store_path: memory.store_path,
            agent_id: memory.agent_id,
            api_key,
            auto_recall: memory.auto_recall,
            auto_capture: memory.auto_capture,
            recall_limit: memory.recall_limit,
            recall_min_score: memory.recall_min_score,
            capture_max_chars: memory.capture_max_chars,
            duplicate_threshold: memory.duplicate_threshold,
            chunk_tokens: chunking.tokens,
            chunk_overlap_tokens: chunking.overlap_tokens,
            transport: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sections
// ─────────────────────────────────────────────────────────────────────────────

/// Memory manager configuration.
///
/// ```toml
/// [memory]
/// store_path = "memory-db"
/// agent_id = "main"
/// auto_recall = true
/// auto_capture = true
/// recall_limit = 3
/// recall_min_score = 0.3
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySection {
    /// Store location. Relative paths live under the data directory.
    pub store_path: String,
    /// Agent (tenant) the entries belong to.
    pub agent_id: String,
    /// Inject relevant memories before each turn.
    pub auto_recall: bool,
    /// Store memorable statements automatically.
    pub auto_capture: bool,
    /// Memories considered by recall.
    pub recall_limit: usize,
    /// Minimum similarity for recall and file search (0.0–1.0).
    pub recall_min_score: f32,
    /// Longest text eligible for capture.
    pub capture_max_chars: usize,
    /// Similarity at or above which new content is a duplicate (0.0–1.0).
    pub duplicate_threshold: f32,
}

impl Default for MemorySection {
    fn default() -> Self {
        Self {
            store_path: DEFAULT_STORE_PATH.to_string(),
            agent_id: DEFAULT_AGENT_ID.to_string(),
            auto_recall: true,
            auto_capture: true,
            recall_limit: DEFAULT_RECALL_LIMIT,
            recall_min_score: DEFAULT_RECALL_MIN_SCORE,
            capture_max_chars: DEFAULT_CAPTURE_MAX_CHARS,
            duplicate_threshold: DEFAULT_DUPLICATE_THRESHOLD,
        }
    }
}

/// Embedding configuration.
///
/// Without an API key (here or in `OPENAI_API_KEY`) the local hash
/// embedder is used.
///
/// ```toml
/// [embedding]
/// dimensions = 1536
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSection {
    /// Output embedding dimensions.
    pub dimensions: usize,
    /// OpenAI API key (prefer the environment variable).
    pub api_key: Option<String>,
}

impl Default for EmbeddingSection {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_DIMENSIONS,
            api_key: None,
        }
    }
}

/// File indexing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSection {
    /// Chunk size in tokens.
    pub tokens: usize,
    /// Overlap between consecutive chunks in tokens.
    pub overlap_tokens: usize,
}

impl Default for ChunkingSection {
    fn default() -> Self {
        let defaults = MemoryManagerConfig::default();
        Self {
            tokens: defaults.chunk_tokens,
            overlap_tokens: defaults.chunk_overlap_tokens,
        }
    }
}
