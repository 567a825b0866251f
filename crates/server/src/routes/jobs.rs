//! API routes for background job management.
//!
//! - GET /jobs: List all jobs that have not finished yet

use axum::extract::State;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

use crate::jobs::JobProgress;
use crate::state::AppState;

/// GET /api/jobs: List all active jobs, oldest first.
async fn list_jobs(State(state): State<Arc<AppState>>) -> axum::Json<Vec<JobProgress>> {
    axum::Json(state.jobs.active_jobs())
}

/// Build the jobs router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/jobs", get(list_jobs))
}
