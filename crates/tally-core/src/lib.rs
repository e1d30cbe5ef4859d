//! Core state for the Tally service.
//!
//! This crate owns the only stateful piece of the service:
//!
//! - **[`PersistentCounter`]** -- a signed integer guarded by a mutex and
//!   mirrored to a plain-text backing file after every mutation
//! - **[`TallyConfig`]** -- typed YAML configuration with environment
//!   overrides
//!
//! The HTTP layer in `tally-http` shares one counter across all request
//! handlers through an [`Arc`](std::sync::Arc); nothing here is global.

pub mod config;
pub mod counter;
pub mod error;

// Re-export primary types for convenience.
pub use config::{ConfigError, TallyConfig};
pub use counter::{PersistentCounter, WriteMode};
pub use error::{LoadError, PersistError};
