//! Shared application state for the Tally HTTP server.
//!
//! [`AppState`] is constructed once at startup and injected into every
//! handler through Axum's `State` extractor. It holds the one counter
//! instance; handlers never reach it any other way.

use std::path::PathBuf;
use std::sync::Arc;

use tally_core::{PersistentCounter, TallyConfig};

use crate::rate_limit::FixedWindowLimiter;

/// Shared state for the Axum application.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The persistent counter behind the `/api` endpoints.
    pub counter: Arc<PersistentCounter>,
    /// Serve the SPA from this directory instead of the embedded build.
    pub assets_dir: Option<PathBuf>,
    /// Limiter for increment/decrement (`None` = unlimited).
    pub rate_limiter: Option<Arc<FixedWindowLimiter>>,
}

impl AppState {
    /// Create state serving the embedded SPA, with no rate limiting.
    pub const fn new(counter: Arc<PersistentCounter>) -> Self {
        Self {
            counter,
            assets_dir: None,
            rate_limiter: None,
        }
    }

    /// Create state from the loaded configuration.
    pub fn from_config(counter: Arc<PersistentCounter>, config: &TallyConfig) -> Self {
        Self {
            counter,
            assets_dir: config.assets.dir.clone(),
            rate_limiter: FixedWindowLimiter::from_config(&config.rate_limit).map(Arc::new),
        }
    }

    /// Serve the SPA from a directory on disk.
    #[must_use]
    pub fn with_assets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.assets_dir = Some(dir.into());
        self
    }

    /// Attach a rate limiter to the mutating endpoints.
    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: FixedWindowLimiter) -> Self {
        self.rate_limiter = Some(Arc::new(limiter));
        self
    }
}
