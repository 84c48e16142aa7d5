//! Gist Notes Core Synchronization Layer
//!
//! This crate keeps a user's markdown notes in GitHub Gists. A note is a gist
//! with at least one `.md` file; the gist description is the note title.
//!
//! # Architecture
//!
//! - **Gist-backed storage**: No local database; GitHub is the source of truth
//! - **Rate-limit aware**: Exhausted quota blocks requests locally until reset
//! - **Token per call**: The access token is resolved for every request and
//!   the HTTP client is rebuilt only when it changes
//! - **Cache invalidation**: Every successful mutation drops the note
//!   collection from the read cache
//!
//! # Modules
//!
//! - [`gateway`] - Authenticated, rate-limited GitHub Gist API client
//! - [`mapper`] - Pure Gist to Note derivation
//! - [`services`] - Note mutations and cached reads (NoteService)
//! - [`models`] - Gist wire types and the Note view
//! - [`config`] - Gateway configuration per front end
//! - [`logging`] - tracing subscriber setup

pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod mapper;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use config::{FrontEnd, GatewayConfig};
pub use error::{GistError, Result};
pub use gateway::{GistGateway, RateLimitState, StaticToken, TokenAccessor};
pub use models::*;
pub use services::*;
