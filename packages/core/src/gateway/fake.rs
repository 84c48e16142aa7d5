//! Fake GitHub Gist API for testing.
//!
//! `FakeGitHub` keeps gists in memory and answers the same REST surface the
//! gateway uses, so tests exercise the full gateway pipeline (token
//! resolution, transport rebuild, rate-limit bookkeeping, status mapping)
//! with only the network swapped out.
//!
//! It also records every request that reached it and how many transports
//! were built, which lets tests assert that a call made *no* outbound request.

use super::transport::{ApiRequest, ApiResponse, GistTransport, HttpMethod, TransportFactory};
use super::rate_limit::RateLimitHeaders;
use crate::error::Result;
use crate::models::{FileChange, Gist, GistFile, GistOwner, GistPatch, NewGist};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Login reported as the owner of every fake gist
pub const FAKE_OWNER_LOGIN: &str = "octocat";

/// A request as it reached the fake server
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub token: String,
    pub body: Option<serde_json::Value>,
}

/// Scripted failure returned for the next request instead of handling it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedFailure {
    pub status: u16,
    pub message: String,
    pub rate_limit: RateLimitHeaders,
}

#[derive(Debug, Clone, Copy)]
struct Quota {
    limit: u32,
    remaining: u32,
    reset: DateTime<Utc>,
}

#[derive(Debug)]
struct FakeState {
    gists: Mutex<Vec<Gist>>,
    quota: Mutex<Quota>,
    requests: Mutex<Vec<RecordedRequest>>,
    failures: Mutex<Vec<ScriptedFailure>>,
    accepted_token: Mutex<Option<String>>,
    transports_built: AtomicUsize,
    id_counter: AtomicUsize,
}

/// In-memory GitHub; also the [`TransportFactory`] handed to the gateway
#[derive(Clone, Debug)]
pub struct FakeGitHub {
    state: Arc<FakeState>,
}

impl FakeGitHub {
    pub fn new() -> Self {
        debug!("[FakeGitHub] Creating new fake server");
        Self {
            state: Arc::new(FakeState {
                gists: Mutex::new(Vec::new()),
                quota: Mutex::new(Quota {
                    limit: 5000,
                    remaining: 5000,
                    reset: Utc::now() + Duration::hours(1),
                }),
                requests: Mutex::new(Vec::new()),
                failures: Mutex::new(Vec::new()),
                accepted_token: Mutex::new(None),
                transports_built: AtomicUsize::new(0),
                id_counter: AtomicUsize::new(1),
            }),
        }
    }

    /// Only this token is accepted; others get 401
    pub fn accept_only_token(&self, token: impl Into<String>) {
        *lock(&self.state.accepted_token) = Some(token.into());
    }

    /// Replace the core quota reported in headers and by `/rate_limit`
    pub fn set_quota(&self, limit: u32, remaining: u32, reset: DateTime<Utc>) {
        *lock(&self.state.quota) = Quota {
            limit,
            remaining,
            reset,
        };
    }

    /// Queue a failure for the next request (FIFO)
    pub fn fail_next(&self, failure: ScriptedFailure) {
        lock(&self.state.failures).push(failure);
    }

    /// Insert a gist directly, bypassing the API
    ///
    /// Files are `(filename, content)` pairs kept in the given order.
    pub fn seed_gist(&self, description: Option<&str>, files: &[(&str, &str)]) -> Gist {
        let files: IndexMap<String, GistFile> = files
            .iter()
            .map(|(name, content)| (name.to_string(), GistFile::with_content(*name, *content)))
            .collect();
        let gist = self.new_gist(description.map(str::to_string), false, files);
        lock(&self.state.gists).push(gist.clone());
        gist
    }

    /// Current server-side copy of a gist
    pub fn gist(&self, id: &str) -> Option<Gist> {
        lock(&self.state.gists).iter().find(|g| g.id == id).cloned()
    }

    pub fn gist_count(&self) -> usize {
        lock(&self.state.gists).len()
    }

    /// Every request that reached the server, in order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state.requests).clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.state.requests).len()
    }

    /// How many transports the gateway built
    pub fn transports_built(&self) -> usize {
        self.state.transports_built.load(Ordering::SeqCst)
    }

    fn new_gist(
        &self,
        description: Option<String>,
        public: bool,
        files: IndexMap<String, GistFile>,
    ) -> Gist {
        let n = self.state.id_counter.fetch_add(1, Ordering::SeqCst);
        let id = format!("{:x}{}", n, uuid::Uuid::new_v4().simple());
        let now = Utc::now();

        Gist {
            html_url: format!("https://gist.github.com/{}", id),
            id,
            description,
            public,
            created_at: now,
            updated_at: now,
            files,
            owner: Some(GistOwner {
                login: FAKE_OWNER_LOGIN.to_string(),
                id: 583231,
                avatar_url: None,
            }),
        }
    }
}

impl Default for FakeGitHub {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportFactory for FakeGitHub {
    fn build(&self, token: &str) -> Result<Arc<dyn GistTransport>> {
        self.state.transports_built.fetch_add(1, Ordering::SeqCst);
        debug!("[FakeGitHub] Building transport");
        Ok(Arc::new(FakeTransport {
            server: self.clone(),
            token: token.to_string(),
        }))
    }
}

/// Transport bound to one token, answering from [`FakeGitHub`]
pub struct FakeTransport {
    server: FakeGitHub,
    token: String,
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn respond(status: u16, rate_limit: RateLimitHeaders, body: serde_json::Value) -> ApiResponse {
    ApiResponse {
        status,
        rate_limit,
        body: if body.is_null() {
            String::new()
        } else {
            body.to_string()
        },
    }
}

fn not_found(rate_limit: RateLimitHeaders) -> ApiResponse {
    respond(404, rate_limit, json!({ "message": "Not Found" }))
}

fn unprocessable(rate_limit: RateLimitHeaders, message: &str) -> ApiResponse {
    respond(422, rate_limit, json!({ "message": message }))
}

impl FakeTransport {
    /// Charge one request against the quota and return the headers to report
    fn charge(&self) -> std::result::Result<RateLimitHeaders, RateLimitHeaders> {
        let mut quota = lock(&self.server.state.quota);
        let exhausted = quota.remaining == 0;
        if !exhausted {
            quota.remaining -= 1;
        }
        let headers = RateLimitHeaders {
            limit: Some(quota.limit),
            remaining: Some(quota.remaining),
            reset: Some(quota.reset.timestamp()),
            retry_after: None,
        };
        if exhausted {
            Err(headers)
        } else {
            Ok(headers)
        }
    }

    fn rate_limit_body(&self) -> serde_json::Value {
        let quota = *lock(&self.server.state.quota);
        let core = json!({
            "limit": quota.limit,
            "remaining": quota.remaining,
            "reset": quota.reset.timestamp(),
            "used": quota.limit.saturating_sub(quota.remaining),
        });
        json!({ "resources": { "core": core }, "rate": core })
    }

    fn list(&self, headers: RateLimitHeaders, request: &ApiRequest) -> ApiResponse {
        let per_page = request
            .query
            .iter()
            .find(|(k, _)| k == "per_page")
            .and_then(|(_, v)| v.parse::<usize>().ok())
            .unwrap_or(30);

        let mut gists: Vec<Gist> = lock(&self.server.state.gists).iter().rev().cloned().collect();
        gists.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        gists.truncate(per_page);

        respond(200, headers, json!(gists))
    }

    fn create(&self, headers: RateLimitHeaders, body: Option<serde_json::Value>) -> ApiResponse {
        let Some(new) = body.and_then(|b| serde_json::from_value::<NewGist>(b).ok()) else {
            return respond(400, headers, json!({ "message": "Problems parsing JSON" }));
        };
        if new.files.is_empty() {
            return unprocessable(headers, "Validation Failed");
        }

        let files = new
            .files
            .into_iter()
            .map(|(name, file)| {
                let entry = GistFile::with_content(name.clone(), file.content);
                (name, entry)
            })
            .collect();
        let gist = self
            .server
            .new_gist(Some(new.description), new.public, files);
        lock(&self.server.state.gists).push(gist.clone());

        respond(201, headers, json!(gist))
    }

    fn update(
        &self,
        headers: RateLimitHeaders,
        id: &str,
        body: Option<serde_json::Value>,
    ) -> ApiResponse {
        let Some(patch) = body.and_then(|b| serde_json::from_value::<GistPatch>(b).ok()) else {
            return respond(400, headers, json!({ "message": "Problems parsing JSON" }));
        };

        let mut gists = lock(&self.server.state.gists);
        let Some(gist) = gists.iter_mut().find(|g| g.id == id) else {
            return not_found(headers);
        };

        let mut files = gist.files.clone();
        for (name, change) in patch.files {
            match change {
                FileChange::Delete => {
                    files.shift_remove(&name);
                }
                FileChange::Keep(content) => match files.get_mut(&name) {
                    Some(existing) => {
                        existing.size = Some(content.len() as u64);
                        existing.content = Some(content);
                    }
                    None => {
                        files.insert(name.clone(), GistFile::with_content(name, content));
                    }
                },
            }
        }
        if files.is_empty() {
            return unprocessable(headers, "Gist must contain at least one file");
        }

        gist.files = files;
        if let Some(description) = patch.description {
            gist.description = Some(description);
        }
        if let Some(public) = patch.public {
            gist.public = public;
        }
        gist.updated_at = Utc::now().max(gist.updated_at + Duration::milliseconds(1));

        respond(200, headers, json!(gist))
    }

    fn delete(&self, headers: RateLimitHeaders, id: &str) -> ApiResponse {
        let mut gists = lock(&self.server.state.gists);
        let before = gists.len();
        gists.retain(|g| g.id != id);
        if gists.len() == before {
            return not_found(headers);
        }
        respond(204, headers, serde_json::Value::Null)
    }

    fn get(&self, headers: RateLimitHeaders, id: &str) -> ApiResponse {
        match self.server.gist(id) {
            Some(gist) => respond(200, headers, json!(gist)),
            None => not_found(headers),
        }
    }
}

#[async_trait]
impl GistTransport for FakeTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        lock(&self.server.state.requests).push(RecordedRequest {
            method: request.method,
            path: request.path.clone(),
            query: request.query.clone(),
            token: self.token.clone(),
            body: request.body.clone(),
        });

        let accepted = lock(&self.server.state.accepted_token).clone();
        if accepted.is_some_and(|t| t != self.token) {
            return Ok(respond(
                401,
                RateLimitHeaders::default(),
                json!({ "message": "Bad credentials" }),
            ));
        }

        let scripted = {
            let mut failures = lock(&self.server.state.failures);
            (!failures.is_empty()).then(|| failures.remove(0))
        };
        if let Some(failure) = scripted {
            return Ok(respond(
                failure.status,
                failure.rate_limit,
                json!({ "message": failure.message }),
            ));
        }

        // `/rate_limit` does not count against the quota
        if request.method == HttpMethod::Get && request.path == "/rate_limit" {
            return Ok(respond(
                200,
                RateLimitHeaders::default(),
                self.rate_limit_body(),
            ));
        }

        let headers = match self.charge() {
            Ok(headers) => headers,
            Err(headers) => {
                return Ok(respond(
                    403,
                    headers,
                    json!({ "message": "API rate limit exceeded" }),
                ))
            }
        };

        let segments: Vec<&str> = request.path.trim_matches('/').split('/').collect();
        let response = match (request.method, segments.as_slice()) {
            (HttpMethod::Get, ["gists"]) => self.list(headers, &request),
            (HttpMethod::Post, ["gists"]) => self.create(headers, request.body),
            (HttpMethod::Get, ["gists", id]) => self.get(headers, id),
            (HttpMethod::Patch, ["gists", id]) => self.update(headers, id, request.body),
            (HttpMethod::Delete, ["gists", id]) => self.delete(headers, id),
            _ => not_found(headers),
        };
        Ok(response)
    }
}
