//! Core memory types: entries, categories, typed metadata and file chunks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Category
// ─────────────────────────────────────────────────────────────────────────────

/// What kind of thing a memory records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// A stated like, dislike or preference.
    Preference,
    /// A statement about the world or the user.
    Fact,
    /// A choice that was made.
    Decision,
    /// Contact details, names and other identifiers.
    Entity,
    /// Anything else.
    #[default]
    Other,
}

impl Category {
    /// All categories, in schema order.
    pub const ALL: [Category; 5] = [
        Category::Preference,
        Category::Fact,
        Category::Decision,
        Category::Entity,
        Category::Other,
    ];

    /// Lowercase name used in metadata, tool schemas and prompt context.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preference => "preference",
            Self::Fact => "fact",
            Self::Decision => "decision",
            Self::Entity => "entity",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown memory category '{}'", s))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Metadata
// ─────────────────────────────────────────────────────────────────────────────

/// Current metadata schema version.
pub const METADATA_VERSION: u32 = 1;

/// Where a stored entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemorySource {
    /// Captured or stored from conversation text.
    Conversation,
    /// A chunk of an indexed workspace file.
    File,
}

impl MemorySource {
    /// Lowercase name as stored in metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conversation => "conversation",
            Self::File => "file",
        }
    }
}

/// Typed per-entry metadata, serialized as camelCase JSON.
///
/// Every field is optional so older or foreign records still parse; the
/// version field lets readers detect future layout changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryMetadata {
    /// Schema version.
    #[serde(default = "default_version")]
    pub v: u32,
    /// Origin of the entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<MemorySource>,
    /// Detected or caller-provided category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// Workspace-relative file path (file entries).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// First covered line, 1-indexed (file entries).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_line: Option<usize>,
    /// Last covered line, inclusive (file entries).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,
    /// Position of the chunk within its file (file entries).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,
    /// Importance weight in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance: Option<f32>,
    /// Whether the entry was captured automatically.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto: Option<bool>,
}

fn default_version() -> u32 {
    METADATA_VERSION
}

impl Default for EntryMetadata {
    fn default() -> Self {
        Self {
            v: METADATA_VERSION,
            source: None,
            category: None,
            path: None,
            start_line: None,
            end_line: None,
            chunk_index: None,
            importance: None,
            auto: None,
        }
    }
}

impl EntryMetadata {
    /// Metadata for a conversational memory.
    pub fn conversation(category: Category) -> Self {
        Self {
            source: Some(MemorySource::Conversation),
            category: Some(category),
            ..Default::default()
        }
    }

    /// Metadata for an indexed file chunk.
    pub fn file_chunk(chunk: &FileChunk, chunk_index: usize) -> Self {
        Self {
            source: Some(MemorySource::File),
            path: Some(chunk.path.clone()),
            start_line: Some(chunk.start_line),
            end_line: Some(chunk.end_line),
            chunk_index: Some(chunk_index),
            ..Default::default()
        }
    }

    /// Set the importance weight.
    pub fn with_importance(mut self, importance: f32) -> Self {
        self.importance = Some(importance);
        self
    }

    /// Mark whether the entry was captured automatically.
    pub fn with_auto(mut self, auto: bool) -> Self {
        self.auto = Some(auto);
        self
    }

    /// Serialize to the JSON string handed to stores.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse metadata read back from a store.
    ///
    /// Returns `None` for unparseable input.
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Entries and Chunks
// ─────────────────────────────────────────────────────────────────────────────

/// A stored memory as returned by a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Unique key.
    pub key: String,
    /// Stored text.
    pub text: String,
    /// Similarity to the query; higher is more relevant.
    pub score: f32,
    /// Metadata, if present and parseable.
    pub metadata: Option<EntryMetadata>,
}

impl MemoryEntry {
    /// Category recovered from metadata, `Other` when absent.
    pub fn category(&self) -> Category {
        self.metadata
            .as_ref()
            .and_then(|m| m.category)
            .unwrap_or_default()
    }

    /// Whether this entry is an indexed file chunk.
    pub fn is_file_chunk(&self) -> bool {
        self.metadata
            .as_ref()
            .is_some_and(|m| m.source == Some(MemorySource::File))
    }
}

/// A line-range slice of a document produced by the chunker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChunk {
    /// Workspace-relative path of the source document.
    pub path: String,
    /// First line, 1-indexed, inclusive.
    pub start_line: usize,
    /// Last line, inclusive.
    pub end_line: usize,
    /// Trimmed chunk text.
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip_names() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
        assert!("opinion".parse::<Category>().is_err());
    }

    #[test]
    fn test_metadata_serializes_camel_case_without_nones() {
        let chunk = FileChunk {
            path: "memory/2024-01-01.md".into(),
            start_line: 3,
            end_line: 9,
            text: "x".into(),
        };
        let json = EntryMetadata::file_chunk(&chunk, 2).to_json().unwrap();
        assert!(json.contains("\"startLine\":3"));
        assert!(json.contains("\"chunkIndex\":2"));
        assert!(json.contains("\"source\":\"file\""));
        assert!(!json.contains("importance"));
    }

    #[test]
    fn test_metadata_parse_tolerates_missing_fields() {
        let meta = EntryMetadata::parse(r#"{"category":"decision"}"#).unwrap();
        assert_eq!(meta.v, METADATA_VERSION);
        assert_eq!(meta.category, Some(Category::Decision));
        assert!(EntryMetadata::parse("not json").is_none());
    }

    #[test]
    fn test_entry_category_defaults_to_other() {
        let entry = MemoryEntry {
            key: "k".into(),
            text: "t".into(),
            score: 0.5,
            metadata: None,
        };
        assert_eq!(entry.category(), Category::Other);
        assert!(!entry.is_file_chunk());
    }
}
