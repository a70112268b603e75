//! Vector store collaborator trait and an in-memory reference store.
//!
//! The memory manager never depends on how a store persists or indexes
//! vectors. It only relies on the contract below:
//!
//! - `store` is an upsert: the same key overwrites.
//! - `search` returns hits ordered best first, with scores that follow
//!   [`VectorStore::score_order`]. Callers threshold with `>=`, so stores
//!   used by the manager must report [`ScoreOrder::HigherIsCloser`].
//! - Every vector has the dimension passed to `open`.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{MemoryError, Result};
use crate::types::{EntryMetadata, MemoryEntry, MemorySource};

/// Collection name used by `clear` when none is given.
pub const DEFAULT_COLLECTION: &str = "memories";

// ─────────────────────────────────────────────────────────────────────────────
// Contract
// ─────────────────────────────────────────────────────────────────────────────

/// Direction of the scores a store reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreOrder {
    /// Similarity: larger scores mean closer vectors.
    HigherIsCloser,
    /// Distance: smaller scores mean closer vectors.
    LowerIsCloser,
}

/// Typed search predicate.
///
/// Each store translates this to its own filtering mechanism.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    /// Only entries whose metadata records this source.
    pub source: Option<MemorySource>,
    /// Only entries stored for this agent.
    pub agent_id: Option<String>,
}

impl SearchFilter {
    /// Filter matching indexed file chunks.
    pub fn files() -> Self {
        Self {
            source: Some(MemorySource::File),
            agent_id: None,
        }
    }

    /// Restrict to one agent.
    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    /// Whether a stored row passes this filter.
    pub fn matches(&self, agent_id: &str, metadata: Option<&EntryMetadata>) -> bool {
        if let Some(wanted) = &self.agent_id
            && wanted != agent_id
        {
            return false;
        }
        match self.source {
            Some(source) => metadata.and_then(|m| m.source) == Some(source),
            None => true,
        }
    }
}

/// A nearest-neighbour store of text entries and their embeddings.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the manager shares one handle
/// across concurrent calls.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Open (or create) the store at `path` for vectors of `dimensions`.
    async fn open(&self, path: &str, dimensions: usize) -> Result<()>;

    /// Insert or overwrite the entry under `key`.
    async fn store(
        &self,
        key: &str,
        agent_id: &str,
        text: &str,
        embedding: &[f32],
        metadata: Option<&EntryMetadata>,
    ) -> Result<()>;

    /// Return up to `limit` entries nearest to `vector`, best first.
    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<MemoryEntry>>;

    /// Delete an entry. Returns `true` if it existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// List keys, optionally restricted to a prefix, in key order.
    async fn list(&self, prefix: Option<&str>, limit: Option<usize>) -> Result<Vec<String>>;

    /// Remove every entry of a collection (default: [`DEFAULT_COLLECTION`]).
    async fn clear(&self, collection: Option<&str>) -> Result<()>;

    /// Direction of the scores returned by `search`.
    fn score_order(&self) -> ScoreOrder {
        ScoreOrder::HigherIsCloser
    }
}

/// Cosine similarity between two equal-length vectors.
///
/// Returns 0.0 when either vector has zero magnitude.
pub(crate) fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Sort hits best first and keep the top `limit`.
pub(crate) fn rank(mut hits: Vec<MemoryEntry>, limit: usize) -> Vec<MemoryEntry> {
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(limit);
    hits
}

pub(crate) fn check_dimensions(expected: usize, vector: &[f32]) -> Result<()> {
    if vector.len() != expected {
        return Err(MemoryError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory Store
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Row {
    agent_id: String,
    text: String,
    embedding: Vec<f32>,
    metadata: Option<EntryMetadata>,
}

#[derive(Debug, Default)]
struct State {
    dimensions: Option<usize>,
    rows: BTreeMap<String, Row>,
    open_calls: usize,
}

/// Brute-force store kept entirely in process memory.
///
/// Useful for tests and for hosts that do not need persistence.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    state: Mutex<State>,
}

impl InMemoryVectorStore {
    /// Create an empty, unopened store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `open` has been called.
    pub fn open_calls(&self) -> usize {
        self.lock().map(|s| s.open_calls).unwrap_or(0)
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.lock().map(|s| s.rows.len()).unwrap_or(0)
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| MemoryError::InvalidData("in-memory store lock poisoned".to_string()))
    }

    fn opened(&self) -> Result<(MutexGuard<'_, State>, usize)> {
        let state = self.lock()?;
        let dims = state.dimensions.ok_or(MemoryError::NotOpen)?;
        Ok((state, dims))
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn open(&self, path: &str, dimensions: usize) -> Result<()> {
        let mut state = self.lock()?;
        if let Some(existing) = state.dimensions
            && existing != dimensions
        {
            return Err(MemoryError::DimensionMismatch {
                expected: existing,
                actual: dimensions,
            });
        }
        state.dimensions = Some(dimensions);
        state.open_calls += 1;
        debug!(path, dimensions, "In-memory vector store opened");
        Ok(())
    }

    async fn store(
        &self,
        key: &str,
        agent_id: &str,
        text: &str,
        embedding: &[f32],
        metadata: Option<&EntryMetadata>,
    ) -> Result<()> {
        let (mut state, dims) = self.opened()?;
        check_dimensions(dims, embedding)?;
        state.rows.insert(
            key.to_string(),
            Row {
                agent_id: agent_id.to_string(),
                text: text.to_string(),
                embedding: embedding.to_vec(),
                metadata: metadata.cloned(),
            },
        );
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<MemoryEntry>> {
        let (state, dims) = self.opened()?;
        check_dimensions(dims, vector)?;
        let hits = state
            .rows
            .iter()
            .filter(|(_, row)| filter.is_none_or(|f| f.matches(&row.agent_id, row.metadata.as_ref())))
            .map(|(key, row)| MemoryEntry {
                key: key.clone(),
                text: row.text.clone(),
                score: cosine(vector, &row.embedding),
                metadata: row.metadata.clone(),
            })
            .collect();
        Ok(rank(hits, limit))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let (mut state, _) = self.opened()?;
        Ok(state.rows.remove(key).is_some())
    }

    async fn list(&self, prefix: Option<&str>, limit: Option<usize>) -> Result<Vec<String>> {
        let (state, _) = self.opened()?;
        Ok(state
            .rows
            .keys()
            .filter(|k| prefix.is_none_or(|p| k.starts_with(p)))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn clear(&self, collection: Option<&str>) -> Result<()> {
        let (mut state, _) = self.opened()?;
        if collection.is_none_or(|c| c == DEFAULT_COLLECTION) {
            state.rows.clear();
        }
        Ok(())
    }
}
