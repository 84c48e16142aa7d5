//! GitHub Gist Wire Types
//!
//! Structures mirroring the GitHub Gist REST representation, plus the request
//! bodies this crate sends. Field names follow GitHub's snake_case JSON.
//!
//! `files` is an [`IndexMap`] so the order GitHub returned files in survives
//! deserialization; the note mapper picks the primary file from that order.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// A single file inside a gist, identified only by its filename
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GistFile {
    pub filename: String,

    /// File body. GitHub may omit it for large files in list responses.
    #[serde(default)]
    pub content: Option<String>,

    /// MIME type reported by GitHub (e.g. "text/markdown")
    #[serde(rename = "type", default)]
    pub file_type: Option<String>,

    #[serde(default)]
    pub language: Option<String>,

    #[serde(default)]
    pub raw_url: Option<String>,

    #[serde(default)]
    pub size: Option<u64>,

    /// Set by GitHub when `content` was cut short
    #[serde(default)]
    pub truncated: bool,
}

impl GistFile {
    /// Build a file with content only, the way freshly written files look
    pub fn with_content(filename: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            filename: filename.into(),
            size: Some(content.len() as u64),
            content: Some(content),
            file_type: None,
            language: None,
            raw_url: None,
            truncated: false,
        }
    }
}

/// Owner of a gist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GistOwner {
    pub login: String,
    pub id: u64,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// A GitHub gist as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gist {
    /// Server-assigned, immutable identifier
    pub id: String,

    #[serde(default)]
    pub description: Option<String>,

    pub public: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Files keyed by current filename, in response order
    #[serde(default)]
    pub files: IndexMap<String, GistFile>,

    #[serde(default)]
    pub owner: Option<GistOwner>,

    #[serde(default)]
    pub html_url: String,
}

/// File body inside a create/update request: `{"content": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
    pub content: String,
}

/// Body of `POST /gists`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGist {
    pub description: String,
    pub public: bool,
    pub files: IndexMap<String, FileContent>,
}

impl NewGist {
    pub fn new(
        description: impl Into<String>,
        files: IndexMap<String, String>,
        public: bool,
    ) -> Self {
        Self {
            description: description.into(),
            public,
            files: files
                .into_iter()
                .map(|(name, content)| (name, FileContent { content }))
                .collect(),
        }
    }
}

/// Per-file instruction inside an update
///
/// Serialized as `{"content": "..."}` for [`FileChange::Keep`] and as JSON
/// `null` for [`FileChange::Delete`], which is how the Gist API expresses
/// "remove this file".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    /// Create or overwrite the file with this content
    Keep(String),
    /// Remove the file from the gist
    Delete,
}

impl Serialize for FileChange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FileChange::Keep(content) => FileContent {
                content: content.clone(),
            }
            .serialize(serializer),
            FileChange::Delete => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for FileChange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<FileContent>::deserialize(deserializer)? {
            Some(file) => FileChange::Keep(file.content),
            None => FileChange::Delete,
        })
    }
}

/// Body of `PATCH /gists/{id}`
///
/// `description` and `public` are partial updates: when `None` they are left
/// out of the JSON entirely so the server keeps its current values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GistPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public: Option<bool>,

    #[serde(default)]
    pub files: IndexMap<String, FileChange>,
}

impl GistPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn public(mut self, public: bool) -> Self {
        self.public = Some(public);
        self
    }

    pub fn keep(mut self, filename: impl Into<String>, content: impl Into<String>) -> Self {
        self.files
            .insert(filename.into(), FileChange::Keep(content.into()));
        self
    }

    pub fn delete(mut self, filename: impl Into<String>) -> Self {
        self.files.insert(filename.into(), FileChange::Delete);
        self
    }
}

/// Snapshot of the core REST quota
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub remaining: u32,
    pub limit: u32,
    pub reset: DateTime<Utc>,
}

/// `GET /rate_limit` response, reduced to `resources.core`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RateLimitResponse {
    pub resources: RateLimitResources,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RateLimitResources {
    pub core: RateLimitWindow,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RateLimitWindow {
    pub limit: u32,
    pub remaining: u32,
    /// Unix epoch seconds
    pub reset: i64,
}

impl RateLimitWindow {
    pub fn into_status(self) -> RateLimitStatus {
        RateLimitStatus {
            remaining: self.remaining,
            limit: self.limit,
            reset: DateTime::from_timestamp(self.reset, 0).unwrap_or_else(Utc::now),
        }
    }
}
