// crates/server/src/jobs/types.rs
//! Types for the background job system.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stages::Stage;

/// Opaque identifier handed back to the submitter (a UUID v4 string).
pub type JobId = String;

/// Generate a fresh job id.
pub fn new_job_id() -> JobId {
    uuid::Uuid::new_v4().to_string()
}

/// Lifecycle status of a refine job.
///
/// Declaration order is lifecycle order, so `Ord` compares how far a job got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Analyzing,
    Enhancing,
    Finalizing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Analyzing => "analyzing",
            Self::Enhancing => "enhancing",
            Self::Finalizing => "finalizing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Completed and failed jobs never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a job as returned by `GET /api/status/{job_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub status: JobStatus,
    pub progress: u8,
    pub message: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobRecord {
    pub(crate) fn queued(created_at: DateTime<Utc>) -> Self {
        Self {
            status: JobStatus::Queued,
            progress: 0,
            message: "Queued".to_string(),
            created_at,
            error: None,
        }
    }
}

/// Partial update merged into an existing [`JobRecord`]. `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub progress: Option<u8>,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl JobUpdate {
    /// Enter a scheduler stage.
    pub fn stage(stage: &Stage) -> Self {
        Self {
            status: Some(stage.status),
            progress: Some(stage.progress),
            message: Some(stage.message.to_string()),
            error: None,
        }
    }

    pub fn completed() -> Self {
        Self {
            status: Some(JobStatus::Completed),
            progress: Some(100),
            message: Some("Done".to_string()),
            error: None,
        }
    }

    /// Terminal failure. Progress is kept at whatever the last stage reported.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Failed),
            progress: None,
            message: Some("Enhancement failed".to_string()),
            error: Some(error.into()),
        }
    }

    pub(crate) fn apply(self, record: &mut JobRecord) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(progress) = self.progress {
            record.progress = progress.min(100);
        }
        if let Some(message) = self.message {
            record.message = message;
        }
        if let Some(error) = self.error {
            record.error = Some(error);
        }
    }
}

/// Progress event broadcast on every registry write and sent over SSE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobProgress {
    pub job_id: JobId,
    #[serde(flatten)]
    pub record: JobRecord,
}
