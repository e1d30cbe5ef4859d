//! Error types for the Tally HTTP layer.
//!
//! [`ApiError`] unifies all failure modes into a single enum that can be
//! converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use tally_core::PersistError;
use tracing::error;

/// Client-facing message for a failed save. The full error, including the
/// file path, goes to the log only.
pub const PERSIST_FAILED_MESSAGE: &str = "counter changed but could not be saved";

/// Errors that can occur in the HTTP API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The counter changed in memory but could not be saved.
    #[error("{0}")]
    Persist(#[from] PersistError),

    /// The mutating endpoints are over their request budget.
    #[error("rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimited {
        /// Whole seconds until the current window closes (at least 1).
        retry_after_secs: u64,
    },

    /// No API route matches the request path.
    #[error("no such endpoint: {0}")]
    NotFound(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// The HTTP status this error maps to.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Persist(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        match self {
            // The new value is still reported: it changed even though it
            // was not saved.
            Self::Persist(e) => {
                error!(error = %e, value = e.value, "counter save failed");
                let body = serde_json::json!({
                    "error": PERSIST_FAILED_MESSAGE,
                    "status": status.as_u16(),
                    "count": e.value,
                });
                (status, axum::Json(body)).into_response()
            }
            Self::RateLimited { retry_after_secs } => {
                let body = serde_json::json!({
                    "error": message,
                    "status": status.as_u16(),
                });
                (
                    status,
                    [(header::RETRY_AFTER, retry_after_secs.to_string())],
                    axum::Json(body),
                )
                    .into_response()
            }
            Self::NotFound(_) | Self::Internal(_) => {
                let body = serde_json::json!({
                    "error": message,
                    "status": status.as_u16(),
                });
                (status, axum::Json(body)).into_response()
            }
        }
    }
}
