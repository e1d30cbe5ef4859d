//! HTTP layer for the Tally counter.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **REST endpoints** for reading, incrementing and decrementing the
//!   shared [`PersistentCounter`](tally_core::PersistentCounter)
//! - **Fixed-window rate limiting** in front of the two mutating endpoints
//! - **SPA asset serving** for everything outside `/api`, from a build
//!   embedded in the binary (or a directory override), falling back to
//!   `index.html` for client-side routes
//!
//! The counter is the only state; the router, the limiter and the asset
//! service hold nothing beyond their configuration.

pub mod assets;
pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod router;
pub mod server;
pub mod state;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use rate_limit::FixedWindowLimiter;
pub use router::build_router;
pub use server::{serve, start_server, ServerError};
pub use state::AppState;
