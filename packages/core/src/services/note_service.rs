//! Note Service - Mutation Protocol and Cached Reads
//!
//! This module provides the note-level operations the front ends call:
//!
//! - Create a note (one `{title}.md` file, description = title)
//! - Update a note, renaming its file in the same request when the title changes
//! - Delete a note: one file when the gist holds other notes, otherwise the gist
//! - Update one file's content in place
//! - Cached listing and single-note reads
//!
//! # Delete Semantics
//!
//! `md_file_count > 1` removes only the named file (`PATCH` with the file set
//! to `null`); siblings are never touched. `md_file_count <= 1` deletes the
//! whole gist.
//!
//! # Concurrency
//!
//! Mutations carry no version or precondition. Two clients writing the same
//! gist race and the last write to reach GitHub wins.
//!
//! # Cache
//!
//! Every successful mutation invalidates the collection key and the key of
//! the note it touched. Reads store their result only if no invalidation
//! happened while they were fetching. See [`crate::services::cache`].

use crate::error::{GistError, Result};
use crate::gateway::GistGateway;
use crate::mapper::{gist_to_note, gists_to_notes, is_markdown_file, note_file_name};
use crate::models::{Gist, GistPatch, Note, MARKDOWN_SUFFIX};
use crate::services::cache::{mutation_invalidations, CacheKey, CachedValue, NoteCache};
use indexmap::IndexMap;
use std::sync::Arc;
use std::time::Duration;

/// Parameters for creating a note
#[derive(Debug, Clone)]
pub struct CreateNoteParams {
    pub title: String,
    pub content: String,
    /// Gists are secret unless asked otherwise
    pub is_public: bool,
}

impl CreateNoteParams {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            is_public: false,
        }
    }
}

/// Parameters for updating a note's title and content
///
/// When `previous_file_name` is set and differs from `{title}.md`, the old
/// file is removed and the new one written in the same request.
#[derive(Debug, Clone)]
pub struct UpdateNoteParams {
    pub id: String,
    pub title: String,
    pub content: String,
    pub previous_file_name: Option<String>,
    pub is_public: Option<bool>,
}

/// Parameters for deleting a note
#[derive(Debug, Clone)]
pub struct DeleteNoteParams {
    pub id: String,
    /// Markdown file being removed
    pub file_name: String,
    /// Markdown files the gist held when the caller last read it
    pub md_file_count: usize,
}

/// Parameters for rewriting a single file
#[derive(Debug, Clone)]
pub struct UpdateFileParams {
    pub id: String,
    pub file_name: String,
    pub content: String,
    pub is_public: Option<bool>,
}

/// What a delete removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// One file removed; the gist remains with these markdown files
    FileRemoved { remaining_md_files: Vec<String> },
    /// The whole gist was deleted
    GistDeleted,
}

fn require_non_blank(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(GistError::validation(format!("{} cannot be empty", field)));
    }
    Ok(())
}

fn markdown_file_name(name: &str) -> String {
    let name = name.trim();
    if is_markdown_file(name) {
        name.to_string()
    } else {
        format!("{}{}", name, MARKDOWN_SUFFIX)
    }
}

pub struct NoteService {
    gateway: Arc<GistGateway>,
    cache: Arc<dyn NoteCache>,
    cache_ttl: Duration,
}

impl NoteService {
    /// Create a note service over a shared gateway and cache
    ///
    /// The cache TTL comes from the gateway's config.
    pub fn new(gateway: Arc<GistGateway>, cache: Arc<dyn NoteCache>) -> Self {
        let cache_ttl = gateway.config().cache_ttl;
        Self {
            gateway,
            cache,
            cache_ttl,
        }
    }

    pub fn gateway(&self) -> &Arc<GistGateway> {
        &self.gateway
    }

    //
    // READS
    //

    /// All notes of the user, optionally filtered by a search term
    pub async fn list_notes(&self, search: Option<&str>) -> Result<Vec<Note>> {
        let key = CacheKey::list(search);
        if let Some(CachedValue::Notes(notes)) = self.cache.get(&key).await {
            tracing::debug!("Cache hit for {}", key);
            return Ok(notes);
        }

        let generation = self.cache.generation().await;
        let gists = self.gateway.get_user_gists().await?;
        let notes = gists_to_notes(&gists, search);
        self.cache
            .set_if_generation(
                key,
                CachedValue::Notes(notes.clone()),
                self.cache_ttl,
                generation,
            )
            .await;
        Ok(notes)
    }

    /// A single note by id
    pub async fn get_note(&self, id: &str) -> Result<Note> {
        let key = CacheKey::note(id);
        if let Some(CachedValue::Note(note)) = self.cache.get(&key).await {
            tracing::debug!("Cache hit for {}", key);
            return Ok(*note);
        }

        let generation = self.cache.generation().await;
        let gist = self.gateway.get_gist(id).await?;
        let note = gist_to_note(&gist)?;
        self.cache
            .set_if_generation(
                key,
                CachedValue::Note(Box::new(note.clone())),
                self.cache_ttl,
                generation,
            )
            .await;
        Ok(note)
    }

    //
    // MUTATIONS
    //

    /// Create a note backed by a new gist holding `{title}.md`
    ///
    /// # Errors
    ///
    /// `ValidationError` if the title or content is blank.
    pub async fn create_note(&self, params: CreateNoteParams) -> Result<Note> {
        require_non_blank("title", &params.title)?;
        require_non_blank("content", &params.content)?;

        let title = params.title.trim();
        let mut files = IndexMap::new();
        files.insert(note_file_name(title), params.content);

        let gist = self
            .gateway
            .create_gist(title, files, params.is_public)
            .await?;
        tracing::info!("Created note {}", gist.id);

        self.after_mutation(&gist.id).await;
        gist_to_note(&gist)
    }

    /// Update a note's title and content, renaming its file if needed
    ///
    /// # Errors
    ///
    /// - `ValidationError` if title or content is blank
    /// - `ValidationError` if the rename target `{title}.md` is already a
    ///   different file of the same gist. GitHub would silently overwrite that
    ///   sibling, so the update is refused before any write.
    /// - `NotFound` if the gist does not exist
    pub async fn update_note(&self, params: UpdateNoteParams) -> Result<Note> {
        require_non_blank("title", &params.title)?;
        require_non_blank("content", &params.content)?;

        let current = self.gateway.get_gist(&params.id).await?;
        let title = params.title.trim();
        let target = note_file_name(title);

        let mut patch = GistPatch::new().description(title);
        if let Some(previous) = params.previous_file_name.as_deref() {
            if previous != target {
                if current.files.contains_key(&target) {
                    return Err(GistError::validation(format!(
                        "a file named {} already exists in this note",
                        target
                    )));
                }
                if current.files.contains_key(previous) {
                    patch = patch.delete(previous);
                }
                tracing::debug!("Renaming {} to {} in gist {}", previous, target, params.id);
            }
        }
        patch = patch.keep(target, params.content);
        if let Some(public) = params.is_public {
            patch = patch.public(public);
        }

        let gist = self.gateway.update_gist(&params.id, &patch).await?;
        tracing::info!("Updated note {}", gist.id);

        self.after_mutation(&gist.id).await;
        gist_to_note(&gist)
    }

    /// Delete one markdown file, or the whole gist when it is the last one
    pub async fn delete_note(&self, params: DeleteNoteParams) -> Result<DeleteOutcome> {
        require_non_blank("file name", &params.file_name)?;

        let outcome = if params.md_file_count > 1 {
            let patch = GistPatch::new().delete(params.file_name.as_str());
            let gist = self.gateway.update_gist(&params.id, &patch).await?;
            tracing::info!(
                "Removed {} from note {} (gist kept)",
                params.file_name,
                params.id
            );
            DeleteOutcome::FileRemoved {
                remaining_md_files: markdown_files(&gist),
            }
        } else {
            self.gateway.delete_gist(&params.id).await?;
            tracing::info!("Deleted note {} (gist removed)", params.id);
            DeleteOutcome::GistDeleted
        };

        self.after_mutation(&params.id).await;
        Ok(outcome)
    }

    /// Rewrite one file in place without touching the description or other files
    ///
    /// # Errors
    ///
    /// `ValidationError` if the filename or content is blank. GitHub treats an
    /// empty `content` as a delete, so blank content is refused here.
    pub async fn update_file_content(&self, params: UpdateFileParams) -> Result<Note> {
        require_non_blank("file name", &params.file_name)?;
        require_non_blank("content", &params.content)?;

        let mut patch = GistPatch::new().keep(params.file_name.as_str(), params.content);
        if let Some(public) = params.is_public {
            patch = patch.public(public);
        }

        let gist = self.gateway.update_gist(&params.id, &patch).await?;
        tracing::info!("Updated {} in note {}", params.file_name, gist.id);

        self.after_mutation(&gist.id).await;
        gist_to_note(&gist)
    }

    /// Add another markdown file to an existing note
    ///
    /// `.md` is appended to `file_name` when missing.
    pub async fn add_note_file(&self, id: &str, file_name: &str, content: &str) -> Result<Note> {
        require_non_blank("file name", file_name)?;
        require_non_blank("content", content)?;

        let file_name = markdown_file_name(file_name);
        let current = self.gateway.get_gist(id).await?;
        if current.files.contains_key(&file_name) {
            return Err(GistError::validation(format!(
                "a file named {} already exists in this note",
                file_name
            )));
        }

        let patch = GistPatch::new().keep(file_name.as_str(), content);
        let gist = self.gateway.update_gist(id, &patch).await?;
        tracing::info!("Added {} to note {}", file_name, gist.id);

        self.after_mutation(&gist.id).await;
        gist_to_note(&gist)
    }

    /// Flip a note's visibility, leaving files and description alone
    pub async fn set_visibility(&self, id: &str, is_public: bool) -> Result<Note> {
        let patch = GistPatch::new().public(is_public);
        let gist = self.gateway.update_gist(id, &patch).await?;
        tracing::info!("Set note {} public={}", gist.id, is_public);

        self.after_mutation(&gist.id).await;
        gist_to_note(&gist)
    }

    async fn after_mutation(&self, note_id: &str) {
        for key in mutation_invalidations(note_id) {
            self.cache.invalidate(&key).await;
        }
    }
}

fn markdown_files(gist: &Gist) -> Vec<String> {
    gist.files
        .keys()
        .filter(|name| is_markdown_file(name))
        .cloned()
        .collect()
}

#[cfg(test)]
#[path = "note_service_test.rs"]
mod note_service_test;
