//! Workspace memory file indexing.
//!
//! Re-indexes `MEMORY.md` and `memory/*.md` into the vector store as
//! chunked entries keyed `file:<path>:<chunk>`. A failing file is recorded
//! in the report and the remaining files are still indexed.

use hippo_embed::Embedder;
use hippo_memory::{EntryMetadata, VectorStore, chunk_markdown};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::fs::{FileKind, FileSystem};

/// Key prefix shared by all indexed file chunks.
pub const FILE_KEY_PREFIX: &str = "file:";

/// Root memory file.
pub const MEMORY_ROOT_FILE: &str = "MEMORY.md";

/// Directory of dated memory files.
pub const MEMORY_DIR: &str = "memory";

/// Store key of one chunk of an indexed file.
pub fn file_chunk_key(path: &str, chunk_index: usize) -> String {
    format!("{}{}:{}", FILE_KEY_PREFIX, path, chunk_index)
}

/// Parameters for one indexing run.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Agent the chunks are stored for.
    pub agent_id: String,
    /// Chunk size in tokens.
    pub chunk_tokens: usize,
    /// Chunk overlap in tokens.
    pub overlap_tokens: usize,
}

/// Report summarizing an indexing run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// Number of chunks embedded and stored.
    pub indexed: usize,
    /// Number of files fully indexed.
    pub files: usize,
    /// Per-file failures as `"<path>: <error>"` (non-fatal).
    pub errors: Vec<String>,
}

impl IndexReport {
    /// Whether any errors occurred during indexing.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

impl std::fmt::Display for IndexReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "IndexReport {{ indexed: {}, files: {}, errors: {} }}",
            self.indexed,
            self.files,
            self.errors.len(),
        )
    }
}

async fn candidate_files(files: &dyn FileSystem) -> Vec<(String, Option<String>)> {
    let mut candidates = Vec::new();

    match files.read_file(MEMORY_ROOT_FILE).await {
        Ok(content) if !content.trim().is_empty() => {
            candidates.push((MEMORY_ROOT_FILE.to_string(), Some(content)));
        }
        Ok(_) => debug!("{} is empty", MEMORY_ROOT_FILE),
        Err(e) => debug!("No {}: {}", MEMORY_ROOT_FILE, e),
    }

    match files.list_files(MEMORY_DIR).await {
        Ok(entries) => {
            let mut names: Vec<String> = entries
                .into_iter()
                .filter(|e| e.kind == FileKind::File && e.name.ends_with(".md"))
                .map(|e| e.name)
                .collect();
            names.sort();
            for name in names {
                candidates.push((format!("{}/{}", MEMORY_DIR, name), None));
            }
        }
        Err(e) => debug!("No {}/ directory: {}", MEMORY_DIR, e),
    }

    candidates
}

async fn index_file(
    store: &dyn VectorStore,
    embedder: &dyn Embedder,
    path: &str,
    content: &str,
    options: &IndexOptions,
    indexed: &mut usize,
) -> Result<()> {
    let chunks = chunk_markdown(content, path, options.chunk_tokens, options.overlap_tokens);
    for (i, chunk) in chunks.iter().enumerate() {
        let embedding = embedder.embed(&chunk.text).await?;
        let metadata = EntryMetadata::file_chunk(chunk, i);
        store
            .store(
                &file_chunk_key(path, i),
                &options.agent_id,
                &chunk.text,
                &embedding,
                Some(&metadata),
            )
            .await?;
        *indexed += 1;
    }
    debug!(path, chunks = chunks.len(), "Indexed file");
    Ok(())
}

/// Replace the file index with the current workspace memory files.
pub async fn index_workspace_memory(
    store: &dyn VectorStore,
    embedder: &dyn Embedder,
    files: &dyn FileSystem,
    options: &IndexOptions,
) -> IndexReport {
    let mut report = IndexReport::default();

    match store.list(Some(FILE_KEY_PREFIX), None).await {
        Ok(keys) => {
            for key in keys {
                if let Err(e) = store.delete(&key).await {
                    warn!(key, error = %e, "Failed to delete stale file chunk");
                }
            }
        }
        Err(e) => debug!("No previous file index to clear: {}", e),
    }

    for (path, preloaded) in candidate_files(files).await {
        let content = match preloaded {
            Some(content) => content,
            None => match files.read_file(&path).await {
                Ok(content) => content,
                Err(e) => {
                    report.errors.push(format!("{}: {}", path, e));
                    continue;
                }
            },
        };
        if content.trim().is_empty() {
            continue;
        }

        match index_file(store, embedder, &path, &content, options, &mut report.indexed).await {
            Ok(()) => report.files += 1,
            Err(e) => {
                warn!(path, error = %e, "Failed to index file");
                report.errors.push(format!("{}: {}", path, e));
            }
        }
    }

    info!("File indexing finished: {}", report);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use crate::fs::FileEntry;
    use async_trait::async_trait;
    use hippo_embed::HashEmbedder;
    use hippo_memory::InMemoryVectorStore;
    use std::collections::HashMap;

    /// Serves fixed files; reading any path in `broken` fails.
    struct StubFiles {
        files: HashMap<&'static str, &'static str>,
        broken: Vec<&'static str>,
    }

    #[async_trait]
    impl FileSystem for StubFiles {
        async fn read_file(&self, path: &str) -> Result<String> {
            if self.broken.contains(&path) {
                return Err(AgentError::file("boom"));
            }
            self.files
                .get(path)
                .map(|s| s.to_string())
                .ok_or_else(|| AgentError::file(format!("{}: not found", path)))
        }

        async fn list_files(&self, dir: &str) -> Result<Vec<FileEntry>> {
            let prefix = format!("{}/", dir);
            Ok(self
                .files
                .keys()
                .chain(self.broken.iter())
                .filter_map(|p| p.strip_prefix(&prefix))
                .map(|name| FileEntry {
                    name: name.to_string(),
                    kind: FileKind::File,
                })
                .collect())
        }
    }

    fn options() -> IndexOptions {
        IndexOptions {
            agent_id: "main".to_string(),
            chunk_tokens: 400,
            overlap_tokens: 80,
        }
    }

    #[tokio::test]
    async fn test_unreadable_file_is_reported_and_others_indexed() {
        let store = InMemoryVectorStore::new();
        store.open("memory-db", 64).await.unwrap();
        let files = StubFiles {
            files: HashMap::from([
                ("MEMORY.md", "Sam owns billing"),
                ("memory/good.md", "We never deploy on fridays"),
            ]),
            broken: vec!["memory/bad.md"],
        };

        let report =
            index_workspace_memory(&store, &HashEmbedder::new(64), &files, &options()).await;

        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("memory/bad.md: "));
        assert!(report.errors[0].contains("boom"));
        assert_eq!(report.files, 2);
        assert_eq!(report.indexed, 2);
        assert_eq!(
            store.list(Some(FILE_KEY_PREFIX), None).await.unwrap(),
            vec!["file:MEMORY.md:0", "file:memory/good.md:0"]
        );
    }

    #[tokio::test]
    async fn test_reindex_drops_stale_chunks() {
        let store = InMemoryVectorStore::new();
        store.open("memory-db", 64).await.unwrap();
        let embedder = HashEmbedder::new(64);
        let stale = embedder.embed("stale").await.unwrap();
        store
            .store("file:memory/old.md:0", "main", "stale", &stale, None)
            .await
            .unwrap();
        let files = StubFiles {
            files: HashMap::from([("MEMORY.md", "Sam owns billing")]),
            broken: Vec::new(),
        };

        let report = index_workspace_memory(&store, &embedder, &files, &options()).await;

        assert!(!report.has_errors());
        assert_eq!(
            store.list(Some(FILE_KEY_PREFIX), None).await.unwrap(),
            vec!["file:MEMORY.md:0"]
        );
    }

    #[test]
    fn test_file_chunk_key() {
        assert_eq!(file_chunk_key("memory/2024-01-01.md", 2), "file:memory/2024-01-01.md:2");
    }

    #[test]
    fn test_report_display() {
        let report = IndexReport {
            indexed: 4,
            files: 2,
            errors: vec!["memory/x.md: boom".into()],
        };
        assert!(report.has_errors());
        let s = report.to_string();
        assert!(s.contains("indexed: 4"));
        assert!(s.contains("errors: 1"));
    }

    #[test]
    fn test_report_default() {
        let report = IndexReport::default();
        assert_eq!(report.indexed, 0);
        assert!(!report.has_errors());
    }
}
