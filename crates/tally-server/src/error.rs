//! Error types for the Tally server binary.
//!
//! [`AppError`] is the top-level error type that wraps every failure
//! that can stop the process during startup or serving.

/// Top-level error for the Tally server binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: tally_core::ConfigError,
    },

    /// The counter file exists but could not be loaded.
    #[error("counter error: {source}")]
    Counter {
        /// The underlying load error.
        #[from]
        source: tally_core::LoadError,
    },

    /// The HTTP server failed to bind or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: tally_http::ServerError,
    },

    /// The logging subscriber could not be installed.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the subscriber failure.
        message: String,
    },
}
