// crates/server/src/lib.rs
//! Image-refine server library.
//!
//! Axum HTTP server that accepts image uploads, enhances them on background
//! jobs and lets clients poll progress and download the result.

pub mod config;
pub mod error;
pub mod jobs;
pub mod metrics;
pub mod routes;
pub mod state;

pub use config::{Cli, ServerConfig};
pub use error::*;
pub use metrics::init_metrics;
pub use routes::api_routes;
pub use state::AppState;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - Health, metrics and `/api` job routes
/// - Upload body limit from the config
/// - CORS (allows any origin)
/// - Request tracing
pub fn create_app(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api_routes(state))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Convenience wrapper building fresh state from `config`.
pub fn create_app_with_config(config: ServerConfig) -> Router {
    create_app(AppState::new(config))
}

// ============================================================================
// Router Tests
// ============================================================================
