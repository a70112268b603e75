//! File-system collaborator used for workspace indexing and `memory_get`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{AgentError, Result};

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// A regular file.
    File,
    /// A directory.
    Directory,
}

/// One entry returned by [`FileSystem::list_files`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Entry name (no directory component).
    pub name: String,
    /// Entry kind.
    #[serde(rename = "type")]
    pub kind: FileKind,
}

/// Read/list access to the agent's workspace.
///
/// Paths are workspace-relative with `/` separators. Both operations fail
/// when the target does not exist.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Read a whole file as UTF-8 text.
    async fn read_file(&self, path: &str) -> Result<String>;

    /// List the entries of a directory.
    async fn list_files(&self, dir: &str) -> Result<Vec<FileEntry>>;
}

/// Shared handle to a file-system collaborator.
pub type SharedFileSystem = Arc<dyn FileSystem>;

// ─────────────────────────────────────────────────────────────────────────────
// Local File System
// ─────────────────────────────────────────────────────────────────────────────

/// [`FileSystem`] over a directory on local disk.
///
/// Every path is resolved under the root; anything that escapes it after
/// canonicalization is refused.
#[derive(Debug, Clone)]
pub struct LocalFileSystem {
    root: PathBuf,
}

impl LocalFileSystem {
    /// Create a file system rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The workspace root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn resolve(&self, path: &str) -> Result<PathBuf> {
        let base = fs::canonicalize(&self.root)
            .await
            .map_err(|e| AgentError::file(format!("Invalid workspace root: {}", e)))?;
        let canonical = fs::canonicalize(base.join(path))
            .await
            .map_err(|e| AgentError::file(format!("{}: {}", path, e)))?;
        if !canonical.starts_with(&base) {
            return Err(AgentError::file(format!(
                "{}: path is outside the workspace",
                path
            )));
        }
        Ok(canonical)
    }
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn read_file(&self, path: &str) -> Result<String> {
        let resolved = self.resolve(path).await?;
        fs::read_to_string(&resolved)
            .await
            .map_err(|e| AgentError::file(format!("{}: {}", path, e)))
    }

    async fn list_files(&self, dir: &str) -> Result<Vec<FileEntry>> {
        let resolved = self.resolve(dir).await?;
        let mut reader = fs::read_dir(&resolved)
            .await
            .map_err(|e| AgentError::file(format!("{}: {}", dir, e)))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| AgentError::file(format!("{}: {}", dir, e)))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| AgentError::file(format!("{}: {}", dir, e)))?;
            let kind = if file_type.is_dir() {
                FileKind::Directory
            } else {
                FileKind::File
            };
            entries.push(FileEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}
