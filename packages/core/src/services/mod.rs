//! Note Services
//!
//! - `NoteService` - note-level mutations and cached reads over the gateway
//! - `cache` - cache keys, invalidation policy and an in-memory `NoteCache`
//!
//! Services sit between the front ends and [`crate::gateway`]; they speak in
//! notes and translate to gist operations.

pub mod cache;
pub mod note_service;

pub use cache::{
    mutation_invalidations, CacheKey, CachedValue, InMemoryNoteCache, NoteCache,
    NOTES_COLLECTION_TAG,
};
pub use note_service::{
    CreateNoteParams, DeleteNoteParams, DeleteOutcome, NoteService, UpdateFileParams,
    UpdateNoteParams,
};
