//! Gist ⇄ Note Mapping
//!
//! Pure conversion between GitHub's multi-file gist and the application's
//! `Note`. Nothing here performs I/O or mutates its input, and the same input
//! always yields the same output.
//!
//! # Primary File
//!
//! The primary file is the first markdown file in the gist's `files` map, in
//! the order GitHub returned them. GitHub does not promise a stable order, so
//! callers must not rely on the same file being primary across requests.

use crate::error::{GistError, Result};
use crate::models::{Gist, Note, SyncStatus, MARKDOWN_SUFFIX, UNTITLED_NOTE};
use indexmap::IndexMap;

/// Whether a gist file belongs to a note (case-sensitive `.md` suffix)
pub fn is_markdown_file(filename: &str) -> bool {
    filename.ends_with(MARKDOWN_SUFFIX)
}

/// Filename a note with this title is stored under
///
/// ```
/// # use gistnotes_core::mapper::note_file_name;
/// assert_eq!(note_file_name("  Groceries "), "Groceries.md");
/// ```
pub fn note_file_name(title: &str) -> String {
    format!("{}{}", title.trim(), MARKDOWN_SUFFIX)
}

/// Lowercase a search term; blank terms mean "no filter"
///
/// Surrounding whitespace is only ignored for the blank check. A non-blank
/// term is matched as typed, so `" foo"` and `"foo"` are different searches.
pub fn normalize_search_term(search: Option<&str>) -> Option<String> {
    search
        .filter(|term| !term.trim().is_empty())
        .map(str::to_lowercase)
}

/// Whether a gist holds at least one markdown file
pub fn has_markdown_file(gist: &Gist) -> bool {
    gist.files.keys().any(|name| is_markdown_file(name))
}

fn derive_title(description: Option<&str>, primary_file: &str) -> String {
    if let Some(description) = description.map(str::trim).filter(|d| !d.is_empty()) {
        return description.to_string();
    }

    let stem = primary_file
        .strip_suffix(MARKDOWN_SUFFIX)
        .unwrap_or(primary_file)
        .trim();
    if stem.is_empty() {
        UNTITLED_NOTE.to_string()
    } else {
        stem.to_string()
    }
}

/// Derive a note from a gist
///
/// # Errors
///
/// Returns [`GistError::NoMarkdownFile`] when the gist has no `.md` files.
/// A partially filled note is never returned.
pub fn gist_to_note(gist: &Gist) -> Result<Note> {
    let md_files: Vec<String> = gist
        .files
        .keys()
        .filter(|name| is_markdown_file(name))
        .cloned()
        .collect();

    let Some(primary) = md_files.first().cloned() else {
        return Err(GistError::no_markdown_file(&gist.id));
    };

    let file_contents: IndexMap<String, String> = md_files
        .iter()
        .map(|name| {
            let content = gist
                .files
                .get(name)
                .and_then(|file| file.content.clone())
                .unwrap_or_default();
            (name.clone(), content)
        })
        .collect();

    let content = file_contents.get(&primary).cloned().unwrap_or_default();

    Ok(Note {
        id: gist.id.clone(),
        gist_id: gist.id.clone(),
        title: derive_title(gist.description.as_deref(), &primary),
        content,
        created_at: gist.created_at,
        updated_at: gist.updated_at,
        tags: Vec::new(),
        file_name: primary,
        md_file_count: md_files.len(),
        md_files,
        file_contents,
        is_public: gist.public,
        owner_login: gist.owner.as_ref().map(|owner| owner.login.clone()),
        sync_status: SyncStatus::Synced,
    })
}

fn matches_search(gist: &Gist, term: &str) -> bool {
    let description_matches = gist
        .description
        .as_deref()
        .is_some_and(|d| d.to_lowercase().contains(term));

    description_matches || gist.files.keys().any(|name| name.to_lowercase().contains(term))
}

/// Derive notes from a gist listing, optionally filtered by a search term
///
/// Gists without markdown files are skipped rather than failing the whole
/// listing. A blank search term applies no filter.
pub fn gists_to_notes(gists: &[Gist], search: Option<&str>) -> Vec<Note> {
    let term = normalize_search_term(search);

    gists
        .iter()
        .filter(|gist| has_markdown_file(gist))
        .filter(|gist| term.as_deref().map_or(true, |t| matches_search(gist, t)))
        .filter_map(|gist| gist_to_note(gist).ok())
        .collect()
}

#[cfg(test)]
#[path = "mapper_test.rs"]
mod mapper_test;
