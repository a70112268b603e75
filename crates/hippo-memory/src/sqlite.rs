//! SQLite-backed vector store.
//!
//! Rows mirror the on-device store layout: `key`, `agent_id`, `text`,
//! `embedding` (little-endian `f32` blob), `metadata` (JSON) and
//! `created_at` (unix millis). Search is brute-force cosine similarity,
//! which is adequate for the few thousand entries a single agent keeps.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tracing::{debug, info, warn};

use crate::error::{MemoryError, Result};
use crate::store::{
    DEFAULT_COLLECTION, SearchFilter, VectorStore, check_dimensions, cosine, rank,
};
use crate::types::{EntryMetadata, MemoryEntry};

/// Marker for paths relative to the store's sandbox root.
pub const SANDBOX_PREFIX: &str = "sandbox://";

/// Database file name inside the store directory.
pub const DATABASE_FILE: &str = "memories.db";

const SCHEMA_VERSION: i32 = 1;

struct Opened {
    conn: Connection,
    dimensions: usize,
}

/// Vector store persisted in a SQLite database.
pub struct SqliteVectorStore {
    root: PathBuf,
    inner: Mutex<Option<Opened>>,
}

impl std::fmt::Debug for SqliteVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteVectorStore")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl SqliteVectorStore {
    /// Create a store whose `sandbox://` and relative paths resolve under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            inner: Mutex::new(None),
        }
    }

    /// Resolve a store path to a directory on disk.
    pub fn resolve(&self, path: &str) -> PathBuf {
        match path.strip_prefix(SANDBOX_PREFIX) {
            Some(rest) => self.root.join(rest),
            None if Path::new(path).is_absolute() => PathBuf::from(path),
            None => self.root.join(path),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Opened>>> {
        self.inner
            .lock()
            .map_err(|_| MemoryError::InvalidData("sqlite store lock poisoned".to_string()))
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection, usize) -> Result<T>) -> Result<T> {
        let guard = self.lock()?;
        let opened = guard.as_ref().ok_or(MemoryError::NotOpen)?;
        f(&opened.conn, opened.dimensions)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Schema
// ─────────────────────────────────────────────────────────────────────────────

fn initialize(conn: &Connection, dimensions: usize) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;

    let current: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .unwrap_or(0);
    if current < SCHEMA_VERSION {
        info!("Creating vector store schema (version {})", SCHEMA_VERSION);
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS memories (
                key TEXT PRIMARY KEY,
                agent_id TEXT NOT NULL,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL,
                metadata TEXT,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_memories_agent_id
                ON memories(agent_id);

            CREATE TABLE IF NOT EXISTS store_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }

    let recorded: Option<String> = conn
        .query_row(
            "SELECT value FROM store_meta WHERE key = 'dimensions'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    match recorded {
        Some(value) => {
            let expected: usize = value.parse().map_err(|_| {
                MemoryError::InvalidData(format!("corrupt dimension record '{}'", value))
            })?;
            if expected != dimensions {
                return Err(MemoryError::DimensionMismatch {
                    expected,
                    actual: dimensions,
                });
            }
        }
        None => {
            conn.execute(
                "INSERT INTO store_meta (key, value) VALUES ('dimensions', ?1)",
                params![dimensions.to_string()],
            )?;
        }
    }
    Ok(())
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// VectorStore
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn open(&self, path: &str, dimensions: usize) -> Result<()> {
        let dir = self.resolve(path);
        std::fs::create_dir_all(&dir).map_err(|e| MemoryError::InvalidPath {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        let db_path = dir.join(DATABASE_FILE);

        let conn = Connection::open_with_flags(
            &db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )?;
        initialize(&conn, dimensions)?;

        *self.lock()? = Some(Opened { conn, dimensions });
        info!("Vector store opened at {:?} ({} dims)", db_path, dimensions);
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
        let metadata = metadata.map(EntryMetadata::to_json).transpose()?;
        self.with_conn(|conn, dims| {
            check_dimensions(dims, embedding)?;
            conn.execute(
                "INSERT OR REPLACE INTO memories (key, agent_id, text, embedding, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    key,
                    agent_id,
                    text,
                    encode_embedding(embedding),
                    metadata,
                    chrono::Utc::now().timestamp_millis()
                ],
            )?;
            debug!(key, "Stored entry");
            Ok(())
        })
    }

    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<MemoryEntry>> {
        self.with_conn(|conn, dims| {
            check_dimensions(dims, vector)?;
            let agent = filter.and_then(|f| f.agent_id.as_deref());
            let mut stmt = conn.prepare(
                "SELECT key, agent_id, text, embedding, metadata FROM memories
                 WHERE ?1 IS NULL OR agent_id = ?1",
            )?;
            let rows = stmt.query_map(params![agent], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Vec<u8>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })?;

            let mut hits = Vec::new();
            for row in rows {
                let (key, agent_id, text, blob, raw_meta) = row?;
                let metadata = raw_meta.as_deref().and_then(EntryMetadata::parse);
                if raw_meta.is_some() && metadata.is_none() {
                    warn!(key, "Ignoring unparseable entry metadata");
                }
                if filter.is_some_and(|f| !f.matches(&agent_id, metadata.as_ref())) {
                    continue;
                }
                let embedding = decode_embedding(&blob);
                if embedding.len() != dims {
                    warn!(key, "Skipping entry with wrong embedding length");
                    continue;
                }
                hits.push(MemoryEntry {
                    score: cosine(vector, &embedding),
                    key,
                    text,
                    metadata,
                });
            }
            Ok(rank(hits, limit))
        })
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.with_conn(|conn, _| {
            let removed = conn.execute("DELETE FROM memories WHERE key = ?1", params![key])?;
            Ok(removed > 0)
        })
    }

    async fn list(&self, prefix: Option<&str>, limit: Option<usize>) -> Result<Vec<String>> {
        self.with_conn(|conn, _| {
            let limit = limit.map(|l| l as i64).unwrap_or(-1);
            let mut stmt = conn.prepare(
                "SELECT key FROM memories
                 WHERE ?1 IS NULL OR substr(key, 1, length(?1)) = ?1
                 ORDER BY key LIMIT ?2",
            )?;
            let keys = stmt
                .query_map(params![prefix, limit], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(keys)
        })
    }

    async fn clear(&self, collection: Option<&str>) -> Result<()> {
        self.with_conn(|conn, _| {
            let collection = collection.unwrap_or(DEFAULT_COLLECTION);
            if collection != DEFAULT_COLLECTION {
                debug!(collection, "Ignoring clear of unknown collection");
                return Ok(());
            }
            let removed = conn.execute("DELETE FROM memories", [])?;
            info!("Cleared {} entries", removed);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, MemorySource};
    use tempfile::TempDir;

    fn vector(values: &[f32]) -> Vec<f32> {
        values.to_vec()
    }

    async fn opened(dir: &TempDir) -> SqliteVectorStore {
        let store = SqliteVectorStore::new(dir.path());
        store.open("sandbox://memory-db", 3).await.unwrap();
        store
    }

    #[test]
    fn test_resolve_paths() {
        let store = SqliteVectorStore::new("/data/app");
        assert_eq!(store.resolve("sandbox://memory-db"), PathBuf::from("/data/app/memory-db"));
        assert_eq!(store.resolve("db"), PathBuf::from("/data/app/db"));
        assert_eq!(store.resolve("/abs/db"), PathBuf::from("/abs/db"));
    }

    #[test]
    fn test_embedding_blob_round_trip() {
        let values = [0.25f32, -1.5, 3.0];
        assert_eq!(decode_embedding(&encode_embedding(&values)), values);
    }

    #[tokio::test]
    async fn test_not_open() {
        let store = SqliteVectorStore::new("/nonexistent");
        assert!(matches!(store.delete("k").await, Err(MemoryError::NotOpen)));
    }

    #[tokio::test]
    async fn test_store_and_search() {
        let dir = TempDir::new().unwrap();
        let store = opened(&dir).await;
        let meta = EntryMetadata::conversation(Category::Preference).with_importance(0.7);
        store
            .store("near", "main", "dark mode", &vector(&[1.0, 0.0, 0.0]), Some(&meta))
            .await
            .unwrap();
        store
            .store("far", "main", "light mode", &vector(&[0.0, 1.0, 0.0]), None)
            .await
            .unwrap();

        let hits = store.search(&vector(&[0.9, 0.1, 0.0]), 5, None).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].key, "near");
        assert!(hits[0].score > hits[1].score);
        assert_eq!(hits[0].category(), Category::Preference);
        assert!(hits[1].metadata.is_none());
        assert!(dir.path().join("memory-db").join(DATABASE_FILE).exists());
    }

    #[tokio::test]
    async fn test_upsert_and_persistence() {
        let dir = TempDir::new().unwrap();
        {
            let store = opened(&dir).await;
            store.store("k", "main", "first", &vector(&[1.0, 0.0, 0.0]), None).await.unwrap();
            store.store("k", "main", "second", &vector(&[1.0, 0.0, 0.0]), None).await.unwrap();
        }
        let store = opened(&dir).await;
        let hits = store.search(&vector(&[1.0, 0.0, 0.0]), 5, None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "second");
    }

    #[tokio::test]
    async fn test_reopen_with_other_dimension_fails() {
        let dir = TempDir::new().unwrap();
        opened(&dir).await;
        let store = SqliteVectorStore::new(dir.path());
        let err = store.open("sandbox://memory-db", 4).await.unwrap_err();
        assert!(matches!(err, MemoryError::DimensionMismatch { expected: 3, actual: 4 }));
    }

    #[tokio::test]
    async fn test_file_filter() {
        let dir = TempDir::new().unwrap();
        let store = opened(&dir).await;
        let file = EntryMetadata {
            source: Some(MemorySource::File),
            path: Some("MEMORY.md".into()),
            ..Default::default()
        };
        store.store("file:MEMORY.md:0", "main", "notes", &vector(&[1.0, 0.0, 0.0]), Some(&file)).await.unwrap();
        store.store("mem_1", "main", "notes", &vector(&[1.0, 0.0, 0.0]), None).await.unwrap();

        let hits = store
            .search(&vector(&[1.0, 0.0, 0.0]), 5, Some(&SearchFilter::files()))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].key, "file:MEMORY.md:0");
    }

    #[tokio::test]
    async fn test_list_delete_clear() {
        let dir = TempDir::new().unwrap();
        let store = opened(&dir).await;
        for key in ["file:a.md:0", "file:a.md:1", "mem_9"] {
            store.store(key, "main", key, &vector(&[0.0, 0.0, 1.0]), None).await.unwrap();
        }
        assert_eq!(
            store.list(Some("file:"), None).await.unwrap(),
            vec!["file:a.md:0", "file:a.md:1"]
        );
        assert_eq!(store.list(None, Some(1)).await.unwrap().len(), 1);
        assert!(store.delete("mem_9").await.unwrap());
        assert!(!store.delete("mem_9").await.unwrap());

        store.clear(Some("other")).await.unwrap();
        assert_eq!(store.list(None, None).await.unwrap().len(), 2);
        store.clear(None).await.unwrap();
        assert!(store.list(None, None).await.unwrap().is_empty());
    }
}
