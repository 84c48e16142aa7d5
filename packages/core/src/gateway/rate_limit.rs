//! Rate-Limit State Machine
//!
//! ```text
//!   NORMAL ──(remaining = 0 / 429 / 403 + retry-after)──▶ LIMITED(reset_at)
//!     ▲                                                         │
//!     └──────────────────(now >= reset_at)──────────────────────┘
//! ```
//!
//! Transitions into `LIMITED` come only from values the server reported
//! (`x-ratelimit-reset`, `retry-after`). A throttling status without either
//! value does not change state. `LIMITED` clears lazily: the next check after
//! `reset_at` moves back to `NORMAL`.

use crate::error::GistError;
use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

/// Rate-limit values parsed from response headers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitHeaders {
    /// `x-ratelimit-limit`
    pub limit: Option<u32>,
    /// `x-ratelimit-remaining`
    pub remaining: Option<u32>,
    /// `x-ratelimit-reset`, Unix epoch seconds
    pub reset: Option<i64>,
    /// `retry-after`, seconds
    pub retry_after: Option<u64>,
}

impl RateLimitHeaders {
    fn reset_at(&self) -> Option<DateTime<Utc>> {
        self.reset.and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitState {
    Normal,
    Limited { reset_at: DateTime<Utc> },
}

impl RateLimitState {
    pub fn is_limited(&self) -> bool {
        matches!(self, RateLimitState::Limited { .. })
    }
}

/// Whether a status code is one GitHub uses for throttling
pub fn is_throttle_status(status: u16) -> bool {
    status == 403 || status == 429
}

/// Work out whether a response puts the token into `LIMITED`, and until when
///
/// Returns `None` when the response carries no server-reported reset time.
pub fn limit_signal(
    status: u16,
    headers: &RateLimitHeaders,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let exhausted = headers.remaining == Some(0);

    if is_throttle_status(status) {
        if let Some(secs) = headers.retry_after {
            return Some(retry_deadline(now, secs));
        }
        if exhausted {
            return headers.reset_at();
        }
        return None;
    }

    if exhausted {
        headers.reset_at()
    } else {
        None
    }
}

/// `now + secs`, saturating at the latest representable time
fn retry_deadline(now: DateTime<Utc>, secs: u64) -> DateTime<Utc> {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|delay| now.checked_add_signed(delay))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Whole seconds until `reset_at`, rounded up, at least 1
pub fn retry_after_secs(reset_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = (reset_at - now).num_milliseconds().max(0) as u64;
    millis.div_ceil(1000).max(1)
}

/// Thread-safe holder of the current [`RateLimitState`]
#[derive(Debug)]
pub struct RateLimitTracker {
    state: Mutex<RateLimitState>,
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RateLimitState::Normal),
        }
    }

    /// Current state, clearing an expired `LIMITED`
    pub fn state(&self, now: DateTime<Utc>) -> RateLimitState {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let RateLimitState::Limited { reset_at } = *state {
            if now >= reset_at {
                tracing::info!("GitHub rate limit window reset, resuming requests");
                *state = RateLimitState::Normal;
            }
        }
        *state
    }

    /// Fail fast with `RateLimited` while the window is closed
    pub fn check(&self, now: DateTime<Utc>) -> Result<(), GistError> {
        match self.state(now) {
            RateLimitState::Normal => Ok(()),
            RateLimitState::Limited { reset_at } => Err(GistError::RateLimited {
                retry_after_secs: retry_after_secs(reset_at, now),
            }),
        }
    }

    /// Enter `LIMITED` until `reset_at`; a later reset never shortens to an earlier one
    pub fn enter_limited(&self, reset_at: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let reset_at = match *state {
            RateLimitState::Limited { reset_at: current } if current > reset_at => current,
            _ => reset_at,
        };
        *state = RateLimitState::Limited { reset_at };
    }

    /// Apply a response's headers; returns the reset time if the state became `LIMITED`
    pub fn observe(
        &self,
        status: u16,
        headers: &RateLimitHeaders,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let reset_at = limit_signal(status, headers, now)?;
        self.enter_limited(reset_at);
        tracing::warn!(
            "GitHub rate limit reached (status {}), blocking requests until {}",
            status,
            reset_at
        );
        Some(reset_at)
    }
}

impl Default for RateLimitTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn exhausted_until(reset: DateTime<Utc>) -> RateLimitHeaders {
        RateLimitHeaders {
            limit: Some(5000),
            remaining: Some(0),
            reset: Some(reset.timestamp()),
            retry_after: None,
        }
    }

    #[test]
    fn test_success_with_remaining_quota_is_not_a_signal() {
        let headers = RateLimitHeaders {
            remaining: Some(12),
            reset: Some(t0().timestamp() + 60),
            ..Default::default()
        };
        assert_eq!(limit_signal(200, &headers, t0()), None);
    }

    #[test]
    fn test_success_with_zero_remaining_limits_until_reset() {
        let reset = t0() + Duration::seconds(90);
        assert_eq!(limit_signal(200, &exhausted_until(reset), t0()), Some(reset));
    }

    #[test]
    fn test_retry_after_takes_precedence_on_throttle_status() {
        let headers = RateLimitHeaders {
            retry_after: Some(30),
            ..exhausted_until(t0() + Duration::seconds(600))
        };
        assert_eq!(
            limit_signal(429, &headers, t0()),
            Some(t0() + Duration::seconds(30))
        );
    }

    #[test]
    fn test_huge_retry_after_saturates_instead_of_overflowing() {
        for secs in [10_000_000_000_000, i64::MAX as u64, u64::MAX] {
            let headers = RateLimitHeaders {
                retry_after: Some(secs),
                ..RateLimitHeaders::default()
            };
            assert_eq!(
                limit_signal(429, &headers, t0()),
                Some(DateTime::<Utc>::MAX_UTC)
            );
        }

        let tracker = RateLimitTracker::new();
        let headers = RateLimitHeaders {
            retry_after: Some(u64::MAX),
            ..RateLimitHeaders::default()
        };
        tracker.observe(403, &headers, t0());
        assert!(tracker.state(t0()).is_limited());
        assert!(matches!(
            tracker.check(t0()),
            Err(GistError::RateLimited { retry_after_secs }) if retry_after_secs > 1
        ));
    }

    #[test]
    fn test_throttle_status_without_server_values_is_not_guessed() {
        assert_eq!(limit_signal(403, &RateLimitHeaders::default(), t0()), None);
        assert_eq!(limit_signal(429, &RateLimitHeaders::default(), t0()), None);
    }

    #[test]
    fn test_retry_after_ignored_on_non_throttle_status() {
        let headers = RateLimitHeaders {
            retry_after: Some(30),
            ..Default::default()
        };
        assert_eq!(limit_signal(503, &headers, t0()), None);
    }

    #[test]
    fn test_retry_after_secs_rounds_up() {
        assert_eq!(retry_after_secs(t0() + Duration::milliseconds(1500), t0()), 2);
        assert_eq!(retry_after_secs(t0() + Duration::seconds(60), t0()), 60);
        assert_eq!(retry_after_secs(t0(), t0()), 1);
    }

    #[test]
    fn test_tracker_transitions() {
        let tracker = RateLimitTracker::new();
        let reset = t0() + Duration::seconds(120);

        assert!(tracker.check(t0()).is_ok());
        assert_eq!(tracker.observe(200, &exhausted_until(reset), t0()), Some(reset));

        assert_eq!(
            tracker.check(t0() + Duration::seconds(20)),
            Err(GistError::RateLimited {
                retry_after_secs: 100
            })
        );
        assert!(tracker.state(t0()).is_limited());

        assert!(tracker.check(reset).is_ok());
        assert_eq!(tracker.state(reset), RateLimitState::Normal);
    }

    #[test]
    fn test_enter_limited_keeps_later_reset() {
        let tracker = RateLimitTracker::new();
        let later = t0() + Duration::seconds(300);
        let earlier = t0() + Duration::seconds(10);

        tracker.enter_limited(later);
        tracker.enter_limited(earlier);

        assert_eq!(
            tracker.state(t0()),
            RateLimitState::Limited { reset_at: later }
        );
    }
}
