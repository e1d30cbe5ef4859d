//! Fixed-window rate limiting for the mutating endpoints.
//!
//! A single [`FixedWindowLimiter`] is shared by every caller: it admits
//! `max_requests` calls per window and rejects the rest with
//! [`ApiError::RateLimited`] before they reach the counter. The limiter is
//! installed as a route layer on `/api/increment` and `/api/decrement`
//! only, so reads and static assets are never throttled.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tally_core::config::RateLimitConfig;
use tracing::warn;

use crate::error::ApiError;

#[derive(Debug)]
struct Window {
    started: Instant,
    used: u32,
}

/// Admits at most `max_requests` per `window`.
///
/// A `max_requests` of 0 rejects everything; a zero-length window resets
/// on every call and so admits everything.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    max_requests: u32,
    window: Duration,
    current: Mutex<Window>,
}

impl FixedWindowLimiter {
    /// Create a limiter whose first window starts now.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            current: Mutex::new(Window {
                started: Instant::now(),
                used: 0,
            }),
        }
    }

    /// Build a limiter from configuration, or `None` when disabled.
    pub fn from_config(config: &RateLimitConfig) -> Option<Self> {
        config
            .enabled
            .then(|| Self::new(config.max_requests, Duration::from_millis(config.window_ms)))
    }

    /// Try to take one slot in the current window.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        self.try_acquire_at(Instant::now())
    }

    /// Try to take one slot as of `now`.
    ///
    /// On rejection, returns the time left until the window resets.
    pub fn try_acquire_at(&self, now: Instant) -> Result<(), Duration> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);

        if now.saturating_duration_since(current.started) >= self.window {
            current.started = now;
            current.used = 0;
        }

        if current.used < self.max_requests {
            current.used = current.used.saturating_add(1);
            return Ok(());
        }

        Err(self
            .window
            .saturating_sub(now.saturating_duration_since(current.started)))
    }
}

/// Axum middleware that rejects requests once the window is exhausted.
pub async fn enforce(
    State(limiter): State<Arc<FixedWindowLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Err(remaining) = limiter.try_acquire() {
        warn!(
            path = %request.uri().path(),
            retry_after = ?remaining,
            "rate limit exceeded"
        );
        return Err(ApiError::RateLimited {
            retry_after_secs: whole_seconds(remaining),
        });
    }

    Ok(next.run(request).await)
}

/// Round up to whole seconds for the `Retry-After` header, never below 1.
const fn whole_seconds(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    let secs = if duration.subsec_nanos() > 0 {
        secs.saturating_add(1)
    } else {
        secs
    };
    if secs == 0 { 1 } else { secs }
}
