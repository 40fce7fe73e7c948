//! API Routes
//!
//! Configures the Axum router with all cache server endpoints.

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    config_handler, health_handler, item_handler, reset_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /item?key=` - Read a value through the active cache
/// - `GET /config?mode=&capacity=&ttl=&latency=` - Switch mode
/// - `GET /stats` - Backend request count and cache counters
/// - `GET /reset` - Reset the backend counter and clear the cache
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin so browser dashboards can poll `/stats`
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/item", get(item_handler))
        .route("/config", get(config_handler))
        .route("/stats", get(stats_handler))
        .route("/reset", get(reset_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
