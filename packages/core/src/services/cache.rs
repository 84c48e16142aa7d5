//! Note Cache Keys and Invalidation Policy
//!
//! The keyed cache itself is a collaborator ([`NoteCache`]); this module fixes
//! how note queries are keyed and which keys a mutation invalidates.
//!
//! # Keys
//!
//! All keys live under the collection tag `"notes"`:
//!
//! - `notes` - the bare collection key ([`CacheKey::Collection`])
//! - `notes:list:<term>` - a listing, keyed by normalized search term (`*` = none)
//! - `notes:note:<id>` - a single note
//!
//! Invalidation is prefix-based: invalidating `notes` drops every key under
//! the tag, so all list variants refresh.
//!
//! # Invalidation
//!
//! Every successful mutation invalidates `notes` and `notes:note:<id>` for the
//! note it touched ([`mutation_invalidations`]). Failed mutations invalidate
//! nothing.
//!
//! # Generations
//!
//! Each invalidation bumps the cache generation. A read captures the
//! generation before fetching and stores its result with
//! [`NoteCache::set_if_generation`], which drops the write if an invalidation
//! landed while the fetch was in flight. Otherwise a read that started before
//! a mutation would put pre-mutation data back for a full TTL.

use crate::mapper::normalize_search_term;
use crate::models::Note;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Tag shared by every note cache key
pub const NOTES_COLLECTION_TAG: &str = "notes";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Bare collection tag; invalidating it invalidates everything below
    Collection,
    /// Note listing for a normalized search term
    List { search: Option<String> },
    /// A single note by id
    Note { id: String },
}

impl CacheKey {
    /// List key with the search term normalized (lowercased, blank = none)
    pub fn list(search: Option<&str>) -> Self {
        Self::List {
            search: normalize_search_term(search),
        }
    }

    pub fn note(id: impl Into<String>) -> Self {
        Self::Note { id: id.into() }
    }

    pub fn tag(&self) -> &'static str {
        NOTES_COLLECTION_TAG
    }

    /// Whether invalidating `self` also invalidates `other`
    pub fn covers(&self, other: &CacheKey) -> bool {
        match self {
            CacheKey::Collection => true,
            _ => self == other,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Collection => write!(f, "{}", NOTES_COLLECTION_TAG),
            CacheKey::List { search } => write!(
                f,
                "{}:list:{}",
                NOTES_COLLECTION_TAG,
                search.as_deref().unwrap_or("*")
            ),
            CacheKey::Note { id } => write!(f, "{}:note:{}", NOTES_COLLECTION_TAG, id),
        }
    }
}

/// Keys a successful mutation of `note_id` must invalidate
pub fn mutation_invalidations(note_id: &str) -> [CacheKey; 2] {
    [CacheKey::Collection, CacheKey::note(note_id)]
}

/// Value stored under a [`CacheKey`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedValue {
    Notes(Vec<Note>),
    Note(Box<Note>),
}

/// Keyed cache collaborator
///
/// Request de-duplication and retry-with-backoff belong to the UI-side cache
/// and are not part of this contract.
#[async_trait]
pub trait NoteCache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Option<CachedValue>;

    async fn set(&self, key: CacheKey, value: CachedValue, ttl: Duration);

    /// Current generation; changes on every [`invalidate`](Self::invalidate)
    async fn generation(&self) -> u64;

    /// Store `value` only if no invalidation happened since `generation`
    ///
    /// Returns whether the value was stored.
    async fn set_if_generation(
        &self,
        key: CacheKey,
        value: CachedValue,
        ttl: Duration,
        generation: u64,
    ) -> bool;

    /// Drop `key` and, for the collection key, everything under it
    async fn invalidate(&self, key: &CacheKey);
}

struct CacheEntry {
    value: CachedValue,
    expires_at: Instant,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    generation: u64,
}

impl CacheState {
    fn insert(&mut self, key: CacheKey, value: CachedValue, ttl: Duration) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
        self.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: now + ttl,
            },
        );
    }
}

/// Process-local [`NoteCache`] with per-entry TTL
#[derive(Default)]
pub struct InMemoryNoteCache {
    state: RwLock<CacheState>,
}

impl InMemoryNoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.state
            .read()
            .await
            .entries
            .values()
            .filter(|entry| entry.expires_at > now)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn contains(&self, key: &CacheKey) -> bool {
        self.get(key).await.is_some()
    }
}

#[async_trait]
impl NoteCache for InMemoryNoteCache {
    async fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        let state = self.state.read().await;
        state
            .entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone())
    }

    async fn set(&self, key: CacheKey, value: CachedValue, ttl: Duration) {
        self.state.write().await.insert(key, value, ttl);
    }

    async fn generation(&self) -> u64 {
        self.state.read().await.generation
    }

    async fn set_if_generation(
        &self,
        key: CacheKey,
        value: CachedValue,
        ttl: Duration,
        generation: u64,
    ) -> bool {
        let mut state = self.state.write().await;
        if state.generation != generation {
            tracing::debug!("Skipped caching {}: invalidated while fetching", key);
            return false;
        }
        state.insert(key, value, ttl);
        true
    }

    async fn invalidate(&self, key: &CacheKey) {
        let mut state = self.state.write().await;
        state.generation = state.generation.wrapping_add(1);
        let before = state.entries.len();
        state.entries.retain(|cached, _| !key.covers(cached));
        tracing::debug!(
            "Invalidated cache key {} ({} entries dropped)",
            key,
            before - state.entries.len()
        );
    }
}
