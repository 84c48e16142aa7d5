//! Data Models
//!
//! - `Gist`, `GistFile`, `GistOwner` - GitHub's representation, as received
//! - `NewGist`, `GistPatch`, `FileChange` - request bodies sent to GitHub
//! - `RateLimitStatus` - core REST quota snapshot
//! - `Note` - the application's view of a gist holding markdown files

mod gist;
mod note;

pub use gist::{
    FileChange, FileContent, Gist, GistFile, GistOwner, GistPatch, NewGist, RateLimitStatus,
};
pub(crate) use gist::RateLimitResponse;
pub use note::{Note, SyncStatus, MARKDOWN_SUFFIX, UNTITLED_NOTE};
