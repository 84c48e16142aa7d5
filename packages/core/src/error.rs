//! Gist Sync Error Types
//!
//! This module defines the error taxonomy shared by the gateway, the note
//! mapper and the mutation protocol. Every failure is returned to the caller;
//! the only recovery performed inside this crate is clearing the rate-limit
//! state once the server-reported reset time has passed and rebuilding the
//! HTTP client when the access token changes.

use std::time::Duration;
use thiserror::Error;

/// Errors produced by gist and note operations
///
/// # Retry Semantics
///
/// | Variant            | Retry?                                   |
/// |--------------------|------------------------------------------|
/// | `NotAuthenticated` | no, caller must sign in                  |
/// | `RateLimited`      | after `retry_after_secs`                 |
/// | `Offline`          | once connectivity returns                |
/// | `ValidationError`  | no, fix input and resubmit               |
/// | `NotFound`         | no                                       |
/// | `NoMarkdownFile`   | no                                       |
/// | `RemoteError`      | no (UI-level policy only)                |
/// | `Transport`        | yes, transient network failure           |
/// | `Serialization`    | no                                       |
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GistError {
    /// No access token could be resolved at call time
    #[error("Not authenticated: no GitHub access token available")]
    NotAuthenticated,

    /// GitHub reported the rate limit as exhausted
    #[error("Rate limited by GitHub, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Connectivity pre-check reported the device offline
    #[error("Offline: no network connectivity")]
    Offline,

    /// Caller input was rejected before or by the API
    #[error("Validation failed: {0}")]
    ValidationError(String),

    /// Gist id does not resolve
    #[error("Gist not found: {id}")]
    NotFound { id: String },

    /// Gist was read but holds no markdown file, so it is not a note
    #[error("Gist {gist_id} contains no markdown (.md) files")]
    NoMarkdownFile { gist_id: String },

    /// Any other non-2xx response from GitHub
    #[error("GitHub API error ({status}): {message}")]
    RemoteError { status: u16, message: String },

    /// Request failed before a response status was received
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl GistError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a not found error
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create a no-markdown-file error
    pub fn no_markdown_file(gist_id: impl Into<String>) -> Self {
        Self::NoMarkdownFile {
            gist_id: gist_id.into(),
        }
    }

    /// Create a remote error from an HTTP status and message
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        Self::RemoteError {
            status,
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Whether a caller-side retry policy may try this operation again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Offline | Self::Transport(_)
        )
    }

    /// Server-derived delay before the next attempt, for `RateLimited` only
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after_secs } => Some(Duration::from_secs(*retry_after_secs)),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for GistError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, GistError>;
