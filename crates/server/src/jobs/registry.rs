// crates/server/src/jobs/registry.rs
//! In-memory registry of job records.

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;
use tokio::sync::broadcast;

use super::types::{JobId, JobProgress, JobRecord, JobUpdate};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Job already exists: {0}")]
    AlreadyExists(JobId),

    #[error("Job not found: {0}")]
    NotFound(JobId),

    #[error("Job registry lock poisoned")]
    Poisoned,
}

/// Keyed store of job records shared by the scheduler tasks and HTTP handlers.
///
/// Reads hand out cloned snapshots, so a reader never sees half of an update.
/// The registry does not police transition order; each job's scheduler task
/// is the only writer for that id and only moves forward.
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, JobRecord>>,
    progress_tx: broadcast::Sender<JobProgress>,
}

impl JobRegistry {
    pub fn new() -> Self {
        let (progress_tx, _) = broadcast::channel(256);
        Self {
            jobs: RwLock::new(HashMap::new()),
            progress_tx,
        }
    }

    /// Insert a fresh `queued` record.
    pub fn create(&self, id: &str) -> Result<JobRecord, RegistryError> {
        let mut jobs = self.jobs.write().map_err(|e| {
            tracing::error!("RwLock poisoned writing jobs map: {e}");
            RegistryError::Poisoned
        })?;
        if jobs.contains_key(id) {
            return Err(RegistryError::AlreadyExists(id.to_string()));
        }
        let record = JobRecord::queued(chrono::Utc::now());
        jobs.insert(id.to_string(), record.clone());
        self.broadcast(id, &record);
        Ok(record)
    }

    /// Snapshot of the current record.
    pub fn get(&self, id: &str) -> Result<JobRecord, RegistryError> {
        let jobs = self.jobs.read().map_err(|e| {
            tracing::error!("RwLock poisoned reading jobs map: {e}");
            RegistryError::Poisoned
        })?;
        jobs.get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Merge `update` into the stored record and return the result.
    pub fn update(&self, id: &str, update: JobUpdate) -> Result<JobRecord, RegistryError> {
        let mut jobs = self.jobs.write().map_err(|e| {
            tracing::error!("RwLock poisoned writing jobs map: {e}");
            RegistryError::Poisoned
        })?;
        let record = jobs
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        update.apply(record);
        let snapshot = record.clone();
        // Sent under the lock so subscribers see events in write order.
        self.broadcast(id, &snapshot);
        Ok(snapshot)
    }

    /// Subscribe to every create/update across all jobs.
    pub fn subscribe(&self) -> broadcast::Receiver<JobProgress> {
        self.progress_tx.subscribe()
    }

    /// All jobs that have not reached a terminal status, oldest first.
    pub fn active_jobs(&self) -> Vec<JobProgress> {
        match self.jobs.read() {
            Ok(jobs) => {
                let mut active: Vec<JobProgress> = jobs
                    .iter()
                    .filter(|(_, r)| !r.status.is_terminal())
                    .map(|(id, r)| JobProgress {
                        job_id: id.clone(),
                        record: r.clone(),
                    })
                    .collect();
                active.sort_by(|a, b| a.record.created_at.cmp(&b.record.created_at));
                active
            }
            Err(e) => {
                tracing::error!("RwLock poisoned reading jobs: {e}");
                Vec::new()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.read().map(|jobs| jobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn broadcast(&self, id: &str, record: &JobRecord) {
        // No subscribers is fine.
        let _ = self.progress_tx.send(JobProgress {
            job_id: id.to_string(),
            record: record.clone(),
        });
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}
