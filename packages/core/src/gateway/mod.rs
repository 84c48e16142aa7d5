//! Remote Gist Gateway
//!
//! - [`GistGateway`] - authenticated entry point for every gist operation
//! - [`RateLimitTracker`] / [`RateLimitState`] - `NORMAL` / `LIMITED(reset_at)`
//! - [`TokenAccessor`], [`ConnectivityCheck`] - injected collaborators
//! - [`GistTransport`], [`TransportFactory`] - HTTP seam (`reqwest` in production)
//! - [`FakeGitHub`] - in-memory GitHub for tests

mod auth;
mod clock;
pub mod fake;
mod gist_gateway;
pub mod rate_limit;
pub mod transport;

pub use auth::{
    AlwaysOnline, ConnectivityCheck, FnTokenAccessor, ManualConnectivity, SharedToken,
    StaticToken, TokenAccessor,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use fake::{FakeGitHub, RecordedRequest, ScriptedFailure};
pub use gist_gateway::GistGateway;
pub use rate_limit::{RateLimitHeaders, RateLimitState, RateLimitTracker};
pub use transport::{
    ApiRequest, ApiResponse, GistTransport, HttpMethod, ReqwestTransport,
    ReqwestTransportFactory, TransportFactory,
};
