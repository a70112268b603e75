//! CLI command handlers.

pub mod config;
pub mod files;
pub mod flush;
pub mod memory;
pub mod tool;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use console::Style;
use tracing::warn;

use hippo_agent::{LocalFileSystem, MemoryManager};
use hippo_config::LoadedConfig;
use hippo_memory::SqliteVectorStore;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Agent workspace root.
    pub workspace: PathBuf,
    /// Root directory for `sandbox://` store paths.
    pub data_dir: PathBuf,
}

impl Context {
    /// Discover config with the workspace as the project directory.
    pub fn load_config(&self) -> Result<LoadedConfig> {
        let loaded = hippo_config::load_config(Some(&self.workspace))?;
        for warning in &loaded.warnings {
            warn!("{}", warning);
        }
        Ok(loaded)
    }

    /// A manager over the on-disk store and workspace, not yet initialized.
    pub fn manager(&self) -> MemoryManager {
        MemoryManager::new(Arc::new(SqliteVectorStore::new(&self.data_dir)))
            .with_files(Arc::new(LocalFileSystem::new(&self.workspace)))
    }

    /// An initialized manager configured from the discovered config.
    pub async fn open_manager(&self) -> Result<Arc<MemoryManager>> {
        let loaded = self.load_config()?;
        let manager = Arc::new(self.manager());
        manager.init(loaded.config.to_manager_config()).await?;
        Ok(manager)
    }

    /// Print a JSON value, pretty.
    pub fn print_json(&self, value: &serde_json::Value) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

/// Print an error line in the CLI's style.
pub fn print_error(message: impl std::fmt::Display) {
    let red = Style::new().red();
    eprintln!("{} {}", red.apply_to("Error:"), message);
}

/// One-line preview of `s`, at most `max_len` characters.
pub fn truncate(s: &str, max_len: usize) -> String {
    let s = s.replace('\n', " ");
    if s.chars().count() <= max_len {
        s
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
