//! Upload endpoint that starts a refine job.

use std::sync::Arc;

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use bytes::Bytes;
use image_refine_core::decode_image;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Multipart field carrying the image.
const UPLOAD_FIELD: &str = "file";

/// Response for a successful submission.
#[derive(Debug, Serialize, Deserialize)]
pub struct RefineResponse {
    pub job_id: String,
    pub status: String,
    pub message: String,
}

/// POST /api/refine - Accept an image upload and start enhancing it.
///
/// The image is decoded before a job exists, so bad uploads never create one.
/// Returns as soon as the job is registered; processing continues in the background.
pub async fn refine(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<RefineResponse>> {
    let mut multipart = multipart.map_err(|e| ApiError::InvalidInput(e.body_text()))?;
    let upload = read_upload(&mut multipart).await?;
    let size = upload.len();

    let image = tokio::task::spawn_blocking(move || decode_image(&upload))
        .await
        .map_err(|e| ApiError::Internal(format!("Decode task failed: {e}")))?
        .map_err(|e| ApiError::InvalidInput(format!("Could not decode image: {e}")))?;

    let job_id = state.scheduler.submit(image)?;
    tracing::debug!(job_id = %job_id, upload_bytes = size, "Refine request accepted");

    Ok(Json(RefineResponse {
        job_id,
        status: "started".to_string(),
        message: "Image enhancement started".to_string(),
    }))
}

/// Pull the bytes of the `file` field, checking its declared content type.
async fn read_upload(multipart: &mut Multipart) -> ApiResult<Bytes> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let is_image = field
            .content_type()
            .map(|ct| ct.starts_with("image/"))
            .unwrap_or(false);
        if !is_image {
            return Err(ApiError::InvalidInput("File must be an image".to_string()));
        }
        return field.bytes().await.map_err(multipart_error);
    }
    Err(ApiError::InvalidInput(format!(
        "Missing multipart field `{UPLOAD_FIELD}`"
    )))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::InvalidInput(err.body_text())
    }
}

/// Create the refine routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/refine", post(refine))
}
