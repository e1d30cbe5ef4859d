//! Axum router construction for the Tally server.
//!
//! Assembles the `/api` routes and the SPA fallback into a single
//! [`Router`] with CORS and request tracing enabled. Any path under the
//! `/api` prefix that no route matches gets a JSON 404, including `/api/`
//! and `/apifoo`.

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::assets;
use crate::handlers;
use crate::rate_limit;
use crate::state::AppState;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /api/count` -- current value
/// - `POST /api/increment` -- increment (rate limited when configured)
/// - `POST /api/decrement` -- decrement (rate limited when configured)
/// - any other path starting with `/api` -- JSON 404
/// - everything else -- SPA assets (embedded, or from `assets_dir`) with
///   `index.html` fallback
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut mutations: Router<Arc<AppState>> = Router::new()
        .route("/increment", post(handlers::increment))
        .route("/decrement", post(handlers::decrement));
    if let Some(limiter) = &state.rate_limiter {
        mutations = mutations.route_layer(middleware::from_fn_with_state(
            Arc::clone(limiter),
            rate_limit::enforce,
        ));
    }

    let api: Router<Arc<AppState>> = Router::new()
        .route("/count", get(handlers::get_count))
        .merge(mutations)
        .fallback(handlers::api_not_found);

    Router::new()
        .nest("/api", api)
        .fallback_service(assets::spa_router(state.assets_dir.as_deref()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
