//! REST API endpoint handlers for the counter.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/count` | Current value |
//! | `POST` | `/api/increment` | Add one, persist, return the new value |
//! | `POST` | `/api/decrement` | Subtract one, persist, return the new value |
//!
//! The counter takes a blocking lock and writes to disk, so every call
//! runs on Tokio's blocking pool rather than on a runtime worker.

use std::sync::Arc;

use axum::extract::{OriginalUri, State};
use axum::Json;
use tally_core::{PersistError, PersistentCounter};

use crate::error::ApiError;
use crate::state::AppState;

/// Response body for every successful counter endpoint.
#[derive(Debug, serde::Serialize)]
pub struct CountResponse {
    /// The counter value after the request.
    pub count: i64,
}

async fn run_blocking<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&PersistentCounter) -> T + Send + 'static,
{
    let counter = Arc::clone(&state.counter);
    tokio::task::spawn_blocking(move || op(&counter))
        .await
        .map_err(|e| ApiError::Internal(format!("counter task failed: {e}")))
}

// ---------------------------------------------------------------------------
// GET /api/count
// ---------------------------------------------------------------------------

/// Return the current counter value.
pub async fn get_count(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = run_blocking(&state, PersistentCounter::value).await?;
    Ok(Json(CountResponse { count }))
}

// ---------------------------------------------------------------------------
// POST /api/increment, POST /api/decrement
// ---------------------------------------------------------------------------

/// Increment the counter.
///
/// A failed save yields a 500 whose body still carries the new value.
pub async fn increment(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CountResponse>, ApiError> {
    mutate(&state, PersistentCounter::increment).await
}

/// Decrement the counter. Values below zero are allowed.
pub async fn decrement(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CountResponse>, ApiError> {
    mutate(&state, PersistentCounter::decrement).await
}

async fn mutate(
    state: &AppState,
    op: fn(&PersistentCounter) -> Result<i64, PersistError>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = run_blocking(state, op).await??;
    Ok(Json(CountResponse { count }))
}

// ---------------------------------------------------------------------------
// Fallback for /api/*
// ---------------------------------------------------------------------------

/// JSON 404 for unknown paths inside the `/api` nest.
///
/// Paths that miss the nest entirely (`/api/`, `/apifoo`) are caught by
/// [`reject_api_paths`](crate::assets::reject_api_paths) instead.
pub async fn api_not_found(OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::NotFound(uri.path().to_owned())
}
