//! HTTP route handlers for the image-refine server.

pub mod health;
pub mod jobs;
pub mod metrics;
pub mod refine;
pub mod result;
pub mod status;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined router.
///
/// Routes:
/// - GET  /health - Liveness check
/// - GET  /metrics - Prometheus metrics
/// - POST /api/refine - Upload an image and start a job
/// - GET  /api/status/{job_id} - Current job record
/// - GET  /api/status/{job_id}/stream - SSE stream of job progress
/// - GET  /api/result/{job_id} - Download the enhanced image
/// - GET  /api/jobs - Jobs that have not finished yet
pub fn api_routes(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .merge(refine::router())
        .merge(status::router())
        .merge(result::router())
        .merge(jobs::router());

    Router::new()
        .merge(health::router())
        .merge(metrics::router())
        .nest("/api", api)
        .with_state(state)
}
