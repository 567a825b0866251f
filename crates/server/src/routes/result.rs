//! Download endpoint for finished images.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::error::{ApiError, ApiResult};
use crate::jobs::JobStatus;
use crate::state::AppState;

/// GET /api/result/{job_id} - Enhanced image as an attachment.
///
/// 404 for unknown jobs, 400 while the job is still running (or failed).
pub async fn get_result(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    let record = state.jobs.get(&job_id)?;
    if record.status != JobStatus::Completed {
        return Err(ApiError::NotReady {
            job_id,
            status: record.status.to_string(),
        });
    }

    let blob = state.results.get(&job_id)?;
    let disposition = format!("attachment; filename={}", blob.file_name());
    Ok((
        [
            (header::CONTENT_TYPE, blob.format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        blob.bytes,
    )
        .into_response())
}

/// Create the result routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/result/{job_id}", get(get_result))
}
