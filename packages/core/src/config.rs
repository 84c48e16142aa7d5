//! Gateway Configuration
//!
//! `GatewayConfig` is built once at application start by each front end and
//! handed to [`GistGateway`](crate::gateway::GistGateway). Every front end
//! identifies itself to GitHub with its own `User-Agent`.

use std::time::Duration;

/// Default GitHub REST API base URL
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// GitHub caps `per_page` at 100
pub const MAX_PER_PAGE: u32 = 100;

/// Environment variable overriding the API base URL (GitHub Enterprise, test servers)
pub const ENV_API_BASE_URL: &str = "GIST_NOTES_API_BASE_URL";

/// Environment variable overriding the User-Agent
pub const ENV_USER_AGENT: &str = "GIST_NOTES_USER_AGENT";

/// Environment variable overriding the request timeout in seconds
pub const ENV_TIMEOUT_SECS: &str = "GIST_NOTES_TIMEOUT_SECS";

/// Application surface issuing the requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontEnd {
    Web,
    Mobile,
    Editor,
}

impl FrontEnd {
    /// User-Agent GitHub sees for this front end
    pub fn user_agent(self) -> &'static str {
        match self {
            FrontEnd::Web => "gist-notes-web",
            FrontEnd::Mobile => "gist-notes-mobile",
            FrontEnd::Editor => "gist-notes-vscode",
        }
    }
}

/// Configuration for the gist gateway and note cache
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL without trailing slash
    pub api_base_url: String,

    /// Sent on every request; GitHub rejects requests without one
    pub user_agent: String,

    /// Page size for `GET /gists` (1..=100)
    pub per_page: u32,

    pub connect_timeout: Duration,

    pub request_timeout: Duration,

    /// How long cached note lists and notes stay fresh
    pub cache_ttl: Duration,
}

impl GatewayConfig {
    /// Defaults for a given front end
    pub fn for_front_end(front_end: FrontEnd) -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            user_agent: front_end.user_agent().to_string(),
            per_page: MAX_PER_PAGE,
            connect_timeout: Duration::from_secs(15),
            request_timeout: Duration::from_secs(60),
            cache_ttl: Duration::from_secs(300),
        }
    }

    /// Defaults for a front end, overridden by `GIST_NOTES_*` environment variables
    pub fn from_env(front_end: FrontEnd) -> Result<Self, String> {
        let mut config = Self::for_front_end(front_end);

        if let Ok(url) = std::env::var(ENV_API_BASE_URL) {
            if !url.trim().is_empty() {
                config.api_base_url = url.trim().trim_end_matches('/').to_string();
            }
        }

        if let Ok(agent) = std::env::var(ENV_USER_AGENT) {
            if !agent.trim().is_empty() {
                config.user_agent = agent.trim().to_string();
            }
        }

        if let Ok(secs) = std::env::var(ENV_TIMEOUT_SECS) {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|e| format!("{} must be an integer: {}", ENV_TIMEOUT_SECS, e))?;
            config.request_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Builder-style override of the base URL
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Builder-style override of the cache TTL
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.api_base_url.trim().is_empty() {
            return Err("api_base_url cannot be empty".to_string());
        }

        if self.user_agent.trim().is_empty() {
            return Err("user_agent cannot be empty".to_string());
        }

        if self.per_page == 0 || self.per_page > MAX_PER_PAGE {
            return Err(format!(
                "per_page must be between 1 and {}",
                MAX_PER_PAGE
            ));
        }

        if self.request_timeout.is_zero() {
            return Err("request_timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::for_front_end(FrontEnd::Web)
    }
}
