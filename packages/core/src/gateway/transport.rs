//! HTTP Transport
//!
//! The transport is the only piece that touches the network. It is built for
//! one access token (the token is baked into its default headers), executes
//! raw requests and reports status, rate-limit headers and body text. Status
//! interpretation and rate-limit bookkeeping stay in the gateway.
//!
//! Implemented by:
//! - [`ReqwestTransport`] - real GitHub over HTTPS
//! - [`FakeTransport`](super::fake::FakeTransport) - in-memory GitHub for tests

use super::rate_limit::RateLimitHeaders;
use crate::config::GatewayConfig;
use crate::error::{GistError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use std::fmt;
use std::sync::Arc;

const GITHUB_JSON: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A request relative to the API base URL
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    /// Path starting with `/`, e.g. `/gists/abc123`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Raw response as seen by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub rate_limit: RateLimitHeaders,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes requests against GitHub with one fixed token
#[async_trait]
pub trait GistTransport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// Builds a transport for a given access token
pub trait TransportFactory: Send + Sync {
    fn build(&self, token: &str) -> Result<Arc<dyn GistTransport>>;
}

/// Production transport over `reqwest`
pub struct ReqwestTransport {
    client: reqwest::Client,
    api_base_url: String,
}

impl ReqwestTransport {
    /// Create a client whose default headers carry the token and User-Agent
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the token or User-Agent is not a valid
    /// header value, `Transport` if the client cannot be initialized.
    pub fn new(config: &GatewayConfig, token: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();

        let mut auth = HeaderValue::from_str(&format!("token {}", token))
            .map_err(|_| GistError::validation("access token contains invalid characters"))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|_| GistError::validation("user agent contains invalid characters"))?;
        headers.insert(USER_AGENT, agent);
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_JSON));
        headers.insert(
            HeaderName::from_static("x-github-api-version"),
            HeaderValue::from_static(GITHUB_API_VERSION),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GistError::transport(e.to_string()))?;

        Ok(Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }
}

fn header_number<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

/// Pull GitHub's rate-limit headers out of a response
pub fn parse_rate_limit_headers(headers: &HeaderMap) -> RateLimitHeaders {
    RateLimitHeaders {
        limit: header_number(headers, "x-ratelimit-limit"),
        remaining: header_number(headers, "x-ratelimit-remaining"),
        reset: header_number(headers, "x-ratelimit-reset"),
        retry_after: header_number(headers, "retry-after"),
    }
}

#[async_trait]
impl GistTransport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = format!("{}{}", self.api_base_url, request.path);

        let mut builder = self
            .client
            .request(request.method.into(), &url)
            .query(&request.query);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| GistError::transport(e.to_string()))?;

        let status = response.status().as_u16();
        let rate_limit = parse_rate_limit_headers(response.headers());
        let body = response
            .text()
            .await
            .map_err(|e| GistError::transport(e.to_string()))?;

        Ok(ApiResponse {
            status,
            rate_limit,
            body,
        })
    }
}

/// Factory producing [`ReqwestTransport`]s from a shared config
#[derive(Debug, Clone)]
pub struct ReqwestTransportFactory {
    config: GatewayConfig,
}

impl ReqwestTransportFactory {
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }
}

impl TransportFactory for ReqwestTransportFactory {
    fn build(&self, token: &str) -> Result<Arc<dyn GistTransport>> {
        Ok(Arc::new(ReqwestTransport::new(&self.config, token)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_rate_limit_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-limit", HeaderValue::from_static("5000"));
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("1700000000"));
        headers.insert("retry-after", HeaderValue::from_static("60"));

        let parsed = parse_rate_limit_headers(&headers);
        assert_eq!(parsed.limit, Some(5000));
        assert_eq!(parsed.remaining, Some(0));
        assert_eq!(parsed.reset, Some(1_700_000_000));
        assert_eq!(parsed.retry_after, Some(60));
    }

    #[test]
    fn test_parse_rate_limit_headers_ignores_garbage() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("lots"));

        assert_eq!(parse_rate_limit_headers(&headers), RateLimitHeaders::default());
    }

    #[test]
    fn test_request_builder() {
        let request = ApiRequest::get("/gists").query("per_page", 100);
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.query, vec![("per_page".to_string(), "100".to_string())]);

        let request = ApiRequest::new(HttpMethod::Patch, "/gists/g1").json(json!({"files": {}}));
        assert_eq!(request.method.to_string(), "PATCH");
        assert!(request.body.is_some());
    }

    #[test]
    fn test_reqwest_transport_rejects_bad_token() {
        let config = GatewayConfig::default();
        let result = ReqwestTransport::new(&config, "bad\ntoken");
        assert!(matches!(result, Err(GistError::ValidationError(_))));
    }

    #[test]
    fn test_reqwest_factory_builds_transport() {
        let factory = ReqwestTransportFactory::new(GatewayConfig::default());
        assert!(factory.build("gho_valid_token").is_ok());
    }
}
