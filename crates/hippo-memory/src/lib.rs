//! Memory building blocks for Hippo.
//!
//! This crate holds everything the memory manager composes that does not
//! itself orchestrate anything:
//!
//! - **Types**: [`MemoryEntry`], [`FileChunk`], typed [`EntryMetadata`]
//! - **Stores**: the [`VectorStore`] collaborator trait with an in-memory
//!   and a SQLite reference implementation
//! - **Classifier**: capture eligibility, categories, injection detection
//!   and prompt-safe formatting
//! - **Chunker**: overlapping markdown chunks with line ranges
//!
//! # Example
//!
//! ```no_run
//! use hippo_memory::{InMemoryVectorStore, VectorStore, should_capture};
//!
//! # async fn example() -> hippo_memory::Result<()> {
//! let store = InMemoryVectorStore::new();
//! store.open("sandbox://memory-db", 4).await?;
//! assert!(should_capture("I prefer dark mode", 500));
//! # Ok(())
//! # }
//! ```

pub mod chunker;
pub mod classifier;
pub mod error;
pub mod sqlite;
pub mod store;
pub mod types;

pub use chunker::{
    CHARS_PER_TOKEN, DEFAULT_CHUNK_TOKENS, DEFAULT_OVERLAP_TOKENS, chunk_markdown,
};
pub use classifier::{
    CaptureRejection, RELEVANT_MEMORIES_CLOSE, RELEVANT_MEMORIES_OPEN, capture_verdict,
    detect_category, escape_memory_for_prompt, format_relevant_memories_context,
    looks_like_prompt_injection, should_capture,
};
pub use error::{MemoryError, Result};
pub use sqlite::{DATABASE_FILE, SANDBOX_PREFIX, SqliteVectorStore};
pub use store::{
    DEFAULT_COLLECTION, InMemoryVectorStore, ScoreOrder, SearchFilter, VectorStore,
};
pub use types::{Category, EntryMetadata, FileChunk, METADATA_VERSION, MemoryEntry, MemorySource};
