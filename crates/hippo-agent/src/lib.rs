//! Memory manager for Hippo.
//!
//! Wires an [`Embedder`](hippo_embed::Embedder), the classifier and a
//! [`VectorStore`](hippo_memory::VectorStore) into the lifecycle an agent
//! framework drives:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  MemoryManager                                              │
//! │  - init once, retry on failure                              │
//! │  - recall before a turn, capture after it                   │
//! │  - store / forget / search / read for the tools             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!              ┌───────────────┼───────────────┐
//!              ▼               ▼               ▼
//!       ┌────────────┐  ┌─────────────┐  ┌────────────┐
//!       │  Embedder  │  │ VectorStore │  │ FileSystem │
//!       │(hippo-embed)│ │(hippo-memory)│ │  (fs.rs)   │
//!       └────────────┘  └─────────────┘  └────────────┘
//! ```
//!
//! # Core Components
//!
//! - [`MemoryManager`]: the orchestrator
//! - [`MemoryManagerConfig`]: toggles, thresholds and store location
//! - [`ToolRegistry`]: the five memory tools, from [`MemoryManager::tools`]
//! - [`index_workspace_memory`]: `MEMORY.md` and `memory/*.md` indexing

pub mod config;
pub mod error;
pub mod fs;
pub mod indexing;
pub mod manager;
pub mod tool;
pub mod tools;

pub use config::{
    DEFAULT_AGENT_ID, DEFAULT_CAPTURE_MAX_CHARS, DEFAULT_DIMENSIONS, DEFAULT_DUPLICATE_THRESHOLD,
    DEFAULT_RECALL_LIMIT, DEFAULT_RECALL_MIN_SCORE, DEFAULT_STORE_PATH, MemoryManagerConfig,
    RECALL_EMBED_TIMEOUT, normalize_store_path,
};
pub use error::{AgentError, Result};
pub use fs::{FileEntry, FileKind, FileSystem, LocalFileSystem, SharedFileSystem};
pub use indexing::{
    FILE_KEY_PREFIX, IndexOptions, IndexReport, MEMORY_DIR, MEMORY_ROOT_FILE, file_chunk_key,
    index_workspace_memory,
};
pub use manager::{
    FLUSH_SENTINEL, ForgetOutcome, MemoryManager, StoreOutcome, flush_prompt_for,
    validate_memory_path,
};

// Re-export tool types
pub use tool::{
    ParamExt, ParamResult, ParameterValidationError, Tool, ToolContext, ToolDefinition,
    ToolRegistry, ToolResult,
};
pub use tools::{
    MemoryForgetTool, MemoryGetTool, MemoryRecallTool, MemorySearchTool, MemoryStoreTool,
    memory_tools,
};
