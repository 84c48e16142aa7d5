//! Gist Gateway - Authenticated Entry Point to the GitHub Gist API
//!
//! Every gist operation goes through [`GistGateway`]. For each call it:
//!
//! 1. Fails fast with `RateLimited` while the rate-limit window is closed
//!    (except [`GistGateway::get_rate_limit_status`])
//! 2. Resolves the access token from the injected [`TokenAccessor`]
//! 3. Runs the injected [`ConnectivityCheck`]
//! 4. Reuses the transport built for that token, or builds and swaps in a new
//!    one when the token changed
//! 5. Executes the request, records rate-limit signals and maps the status
//!    into [`GistError`]
//!
//! # Sharing
//!
//! Construct one gateway at application start and share it as
//! `Arc<GistGateway>`. It is safe to call concurrently. The `(token,
//! transport)` pair is swapped under a write lock; requests already in
//! flight keep their own `Arc` to the previous transport.
//!
//! # Examples
//!
//! ```rust,no_run
//! use gistnotes_core::config::{FrontEnd, GatewayConfig};
//! use gistnotes_core::gateway::{GistGateway, SharedToken};
//! use std::sync::Arc;
//!
//! # async fn example() -> gistnotes_core::Result<()> {
//! let tokens = Arc::new(SharedToken::new());
//! tokens.sign_in("gho_example");
//!
//! let gateway = GistGateway::github(GatewayConfig::for_front_end(FrontEnd::Web), tokens);
//! let gists = gateway.get_user_gists().await?;
//! println!("{} gists", gists.len());
//! # Ok(())
//! # }
//! ```

use super::auth::{AlwaysOnline, ConnectivityCheck, TokenAccessor};
use super::clock::{Clock, SystemClock};
use super::rate_limit::{is_throttle_status, retry_after_secs, RateLimitState, RateLimitTracker};
use super::transport::{
    ApiRequest, ApiResponse, GistTransport, HttpMethod, ReqwestTransportFactory, TransportFactory,
};
use crate::config::GatewayConfig;
use crate::error::{GistError, Result};
use crate::models::{Gist, GistPatch, NewGist, RateLimitResponse, RateLimitStatus};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Transport currently in use and the token it was built with
struct ActiveClient {
    token: String,
    transport: Arc<dyn GistTransport>,
}

/// GitHub error body: `{"message": "...", "documentation_url": "..."}`
#[derive(Debug, Deserialize)]
struct GitHubErrorBody {
    message: Option<String>,
}

pub struct GistGateway {
    config: GatewayConfig,
    tokens: Arc<dyn TokenAccessor>,
    connectivity: Arc<dyn ConnectivityCheck>,
    transports: Arc<dyn TransportFactory>,
    clock: Arc<dyn Clock>,
    rate_limit: RateLimitTracker,
    active: RwLock<Option<ActiveClient>>,
}

impl GistGateway {
    /// Create a gateway with explicit collaborators
    ///
    /// Connectivity defaults to always-online and the clock to system time;
    /// override with [`with_connectivity`](Self::with_connectivity) and
    /// [`with_clock`](Self::with_clock).
    pub fn new(
        config: GatewayConfig,
        tokens: Arc<dyn TokenAccessor>,
        transports: Arc<dyn TransportFactory>,
    ) -> Self {
        Self {
            config,
            tokens,
            connectivity: Arc::new(AlwaysOnline),
            transports,
            clock: Arc::new(SystemClock),
            rate_limit: RateLimitTracker::new(),
            active: RwLock::new(None),
        }
    }

    /// Create a gateway talking to GitHub over HTTPS
    pub fn github(config: GatewayConfig, tokens: Arc<dyn TokenAccessor>) -> Self {
        let transports = Arc::new(ReqwestTransportFactory::new(config.clone()));
        Self::new(config, tokens, transports)
    }

    pub fn with_connectivity(mut self, connectivity: Arc<dyn ConnectivityCheck>) -> Self {
        self.connectivity = connectivity;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Current rate-limit state, independent of any request
    pub fn rate_limit_state(&self) -> RateLimitState {
        self.rate_limit.state(self.clock.now())
    }

    //
    // GIST OPERATIONS
    //

    /// Fetch up to `per_page` (100) most recently updated gists of the user
    ///
    /// GitHub's listing may omit file contents; use [`get_gist`](Self::get_gist)
    /// for full bodies.
    pub async fn get_user_gists(&self) -> Result<Vec<Gist>> {
        let request = ApiRequest::get("/gists").query("per_page", self.config.per_page);
        let response = self.send(request, None).await?;
        decode(&response)
    }

    /// Create a gist from `filename → content`
    ///
    /// # Errors
    ///
    /// `ValidationError` if `files` is empty; checked before any I/O.
    pub async fn create_gist(
        &self,
        description: &str,
        files: IndexMap<String, String>,
        is_public: bool,
    ) -> Result<Gist> {
        if files.is_empty() {
            return Err(GistError::validation("a gist needs at least one file"));
        }

        let body = serde_json::to_value(NewGist::new(description, files, is_public))?;
        let request = ApiRequest::new(HttpMethod::Post, "/gists").json(body);
        let response = self.send(request, None).await?;
        let gist: Gist = decode(&response)?;

        tracing::debug!("Created gist {} with {} file(s)", gist.id, gist.files.len());
        Ok(gist)
    }

    /// Apply a partial update; `FileChange::Delete` entries remove files
    pub async fn update_gist(&self, gist_id: &str, patch: &GistPatch) -> Result<Gist> {
        let path = gist_path(gist_id)?;
        let body = serde_json::to_value(patch)?;
        let request = ApiRequest::new(HttpMethod::Patch, path).json(body);
        let response = self.send(request, Some(gist_id)).await?;
        decode(&response)
    }

    /// Delete a gist and all its files
    pub async fn delete_gist(&self, gist_id: &str) -> Result<()> {
        let path = gist_path(gist_id)?;
        self.send(ApiRequest::new(HttpMethod::Delete, path), Some(gist_id))
            .await?;
        tracing::debug!("Deleted gist {}", gist_id);
        Ok(())
    }

    pub async fn get_gist(&self, gist_id: &str) -> Result<Gist> {
        let path = gist_path(gist_id)?;
        let response = self.send(ApiRequest::get(path), Some(gist_id)).await?;
        decode(&response)
    }

    /// Query `resources.core` of `GET /rate_limit`
    ///
    /// Not blocked by the `LIMITED` state. A reported `remaining == 0` moves
    /// the gateway into `LIMITED` until the reported reset.
    pub async fn get_rate_limit_status(&self) -> Result<RateLimitStatus> {
        let transport = self.authorized_transport().await?;
        let response = self
            .execute(transport.as_ref(), ApiRequest::get("/rate_limit"), None)
            .await?;
        let parsed: RateLimitResponse = decode(&response)?;
        let status = parsed.resources.core.into_status();

        if status.remaining == 0 {
            self.rate_limit.enter_limited(status.reset);
        }
        Ok(status)
    }

    //
    // REQUEST PIPELINE
    //

    async fn send(&self, request: ApiRequest, gist_id: Option<&str>) -> Result<ApiResponse> {
        self.rate_limit.check(self.clock.now())?;
        let transport = self.authorized_transport().await?;
        self.execute(transport.as_ref(), request, gist_id).await
    }

    /// Resolve token, check connectivity, and hand out the matching transport
    async fn authorized_transport(&self) -> Result<Arc<dyn GistTransport>> {
        let token = self
            .tokens
            .access_token()
            .await
            .filter(|token| !token.trim().is_empty())
            .ok_or(GistError::NotAuthenticated)?;

        if !self.connectivity.is_online().await {
            return Err(GistError::Offline);
        }

        self.transport_for(&token).await
    }

    async fn transport_for(&self, token: &str) -> Result<Arc<dyn GistTransport>> {
        {
            let active = self.active.read().await;
            if let Some(client) = active.as_ref().filter(|c| c.token == token) {
                return Ok(Arc::clone(&client.transport));
            }
        }

        let mut active = self.active.write().await;
        // Another caller may have rebuilt while we waited for the write lock
        if let Some(client) = active.as_ref().filter(|c| c.token == token) {
            return Ok(Arc::clone(&client.transport));
        }

        let transport = self.transports.build(token)?;
        tracing::info!(
            "Access token changed, rebuilt GitHub client ({})",
            self.config.user_agent
        );
        *active = Some(ActiveClient {
            token: token.to_string(),
            transport: Arc::clone(&transport),
        });
        Ok(transport)
    }

    async fn execute(
        &self,
        transport: &dyn GistTransport,
        request: ApiRequest,
        gist_id: Option<&str>,
    ) -> Result<ApiResponse> {
        tracing::debug!("GitHub {} {}", request.method, request.path);
        let path = request.path.clone();

        let response = transport.execute(request).await?;
        let now = self.clock.now();
        let limited_until = self
            .rate_limit
            .observe(response.status, &response.rate_limit, now);

        if response.is_success() {
            return Ok(response);
        }

        let message = error_message(&response);
        tracing::debug!("GitHub {} failed with {}: {}", path, response.status, message);

        match response.status {
            401 => Err(GistError::NotAuthenticated),
            404 => match gist_id {
                Some(id) => Err(GistError::not_found(id)),
                None => Err(GistError::remote(404, message)),
            },
            422 => Err(GistError::ValidationError(message)),
            status if is_throttle_status(status) => match limited_until {
                Some(reset_at) => Err(GistError::RateLimited {
                    retry_after_secs: retry_after_secs(reset_at, now),
                }),
                None => Err(GistError::remote(status, message)),
            },
            status => Err(GistError::remote(status, message)),
        }
    }
}

fn gist_path(gist_id: &str) -> Result<String> {
    let gist_id = gist_id.trim();
    if gist_id.is_empty() || gist_id.contains('/') {
        return Err(GistError::validation(format!(
            "invalid gist id: {:?}",
            gist_id
        )));
    }
    Ok(format!("/gists/{}", gist_id))
}

fn decode<T: DeserializeOwned>(response: &ApiResponse) -> Result<T> {
    serde_json::from_str(&response.body).map_err(|e| {
        GistError::serialization(format!(
            "failed to decode GitHub response ({}): {}",
            response.status, e
        ))
    })
}

fn error_message(response: &ApiResponse) -> String {
    serde_json::from_str::<GitHubErrorBody>(&response.body)
        .ok()
        .and_then(|body| body.message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| {
            let body = response.body.trim();
            if body.is_empty() {
                format!("HTTP {}", response.status)
            } else {
                body.to_string()
            }
        })
}

#[cfg(test)]
#[path = "gist_gateway_test.rs"]
mod gist_gateway_test;
