//! Job status endpoints.
//!
//! - GET /status/{job_id}: Current job record
//! - GET /status/{job_id}/stream: SSE stream of the job's progress until it ends

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::{Json, Router};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_stream::{Stream, StreamExt};

use crate::error::ApiResult;
use crate::jobs::{JobProgress, JobRecord, JobRegistry, JobStatus};
use crate::state::AppState;

/// GET /api/status/{job_id} - Current state of a job.
pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobRecord>> {
    Ok(Json(state.jobs.get(&job_id)?))
}

/// GET /api/status/{job_id}/stream - SSE stream of one job's progress.
///
/// Emits the current record first, then every later change, and closes after
/// the terminal status.
pub async fn stream_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    // Subscribe before the snapshot so no update slips between the two.
    let rx = state.jobs.subscribe();
    let initial = state.jobs.get(&job_id)?;
    let updates = progress_stream(
        Arc::clone(&state.jobs),
        rx,
        JobProgress {
            job_id,
            record: initial,
        },
    );

    let events = updates.map(|progress| Ok(progress_event(&progress)));
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// Progress for `initial.job_id`, starting with `initial` and ending after the
/// first terminal status.
///
/// Events that would move the status backwards are dropped. When the receiver
/// lags, the registry is re-read instead of replaying the missed events.
pub(crate) fn progress_stream(
    jobs: Arc<JobRegistry>,
    mut rx: broadcast::Receiver<JobProgress>,
    initial: JobProgress,
) -> impl Stream<Item = JobProgress> {
    async_stream::stream! {
        let job_id = initial.job_id.clone();
        let mut last: JobStatus = initial.record.status;
        yield initial;

        while !last.is_terminal() {
            let progress = match rx.recv().await {
                Ok(progress) if progress.job_id == job_id => progress,
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(job_id = %job_id, skipped, "Status stream lagged, resyncing");
                    match jobs.get(&job_id) {
                        Ok(record) => JobProgress {
                            job_id: job_id.clone(),
                            record,
                        },
                        Err(_) => break,
                    }
                }
                Err(RecvError::Closed) => break,
            };
            if progress.record.status < last {
                continue;
            }
            last = progress.record.status;
            yield progress;
        }
    }
}

fn progress_event(progress: &JobProgress) -> Event {
    let json = serde_json::to_string(progress).unwrap_or_default();
    Event::default().event("progress").data(json)
}

/// Build the status router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status/{job_id}", get(get_status))
        .route("/status/{job_id}/stream", get(stream_status))
}
