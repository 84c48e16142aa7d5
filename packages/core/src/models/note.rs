//! Note Domain Model
//!
//! A `Note` is a projection of a gist: it is never stored on its own and is
//! re-derived from the backing [`Gist`](super::Gist) on every read. See
//! [`crate::mapper`] for the derivation rules.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Title used when neither the description nor the primary filename yields one
pub const UNTITLED_NOTE: &str = "Untitled Note";

/// Suffix that marks a gist file as part of a note
pub const MARKDOWN_SUFFIX: &str = ".md";

/// Where a note stands relative to GitHub
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Matches the last server read
    #[default]
    Synced,
    /// A local edit has been issued but not confirmed
    Pending,
    /// The last write failed
    Error,
}

/// One or more markdown files inside a single gist, presented as a unit
///
/// # Invariants
///
/// - `id == gist_id`
/// - `md_files` is non-empty and lists exactly the `.md` keys of the gist
/// - `file_name` is `md_files[0]`; `content` is that file's body
/// - `md_file_count == md_files.len()`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub gist_id: String,
    pub title: String,

    /// Content of the primary file
    pub content: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Primary markdown filename
    pub file_name: String,

    pub md_file_count: usize,

    /// Markdown filenames in gist response order
    pub md_files: Vec<String>,

    pub file_contents: IndexMap<String, String>,

    pub is_public: bool,

    pub owner_login: Option<String>,

    #[serde(default)]
    pub sync_status: SyncStatus,
}

impl Note {
    /// Content of one of the note's markdown files
    pub fn file_content(&self, file_name: &str) -> Option<&str> {
        self.file_contents.get(file_name).map(String::as_str)
    }

    /// Whether removing one file would leave the gist holding other notes
    pub fn has_siblings(&self) -> bool {
        self.md_file_count > 1
    }
}
