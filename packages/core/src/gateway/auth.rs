//! Token and Connectivity Collaborators
//!
//! The gateway never stores an access token of its own. It asks a
//! [`TokenAccessor`] on every call so sign-out and sign-in take effect without
//! rebuilding the gateway. Token storage and OAuth flows live in the front ends.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// Resolves the current GitHub access token, if any
#[async_trait]
pub trait TokenAccessor: Send + Sync {
    async fn access_token(&self) -> Option<String>;
}

/// Reports whether the device currently has network connectivity
#[async_trait]
pub trait ConnectivityCheck: Send + Sync {
    async fn is_online(&self) -> bool;
}

/// Fixed token, mainly for scripts and tests
#[derive(Debug, Clone)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

#[async_trait]
impl TokenAccessor for StaticToken {
    async fn access_token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Token slot a front end updates on sign-in / sign-out
#[derive(Debug, Default)]
pub struct SharedToken {
    token: RwLock<Option<String>>,
}

impl SharedToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, token: impl Into<String>) {
        let mut slot = self.token.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(token.into());
    }

    pub fn sign_out(&self) {
        let mut slot = self.token.write().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }
}

#[async_trait]
impl TokenAccessor for SharedToken {
    async fn access_token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Adapts a plain closure into a [`TokenAccessor`]
pub struct FnTokenAccessor<F>(pub F);

#[async_trait]
impl<F> TokenAccessor for FnTokenAccessor<F>
where
    F: Fn() -> Option<String> + Send + Sync,
{
    async fn access_token(&self) -> Option<String> {
        (self.0)()
    }
}

/// Connectivity check that never reports offline
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOnline;

#[async_trait]
impl ConnectivityCheck for AlwaysOnline {
    async fn is_online(&self) -> bool {
        true
    }
}

/// Connectivity flag toggled by the host (network callbacks, tests)
#[derive(Debug)]
pub struct ManualConnectivity {
    online: AtomicBool,
}

impl ManualConnectivity {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Release);
    }
}

impl Default for ManualConnectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl ConnectivityCheck for ManualConnectivity {
    async fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }
}
