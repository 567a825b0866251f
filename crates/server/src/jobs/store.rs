// crates/server/src/jobs/store.rs
//! Write-once storage for finished result images.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::RwLock;

use bytes::Bytes;
use image_refine_core::OutputFormat;
use thiserror::Error;

use super::types::JobId;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Result already stored for job {0}")]
    AlreadyStored(JobId),

    #[error("Result not found for job {0}")]
    NotFound(JobId),

    #[error("Result store lock poisoned")]
    Poisoned,
}

/// Encoded output of a completed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultBlob {
    pub bytes: Bytes,
    pub format: OutputFormat,
}

impl ResultBlob {
    pub fn new(bytes: impl Into<Bytes>, format: OutputFormat) -> Self {
        Self {
            bytes: bytes.into(),
            format,
        }
    }

    /// Suggested download name, e.g. `enhanced.png`.
    pub fn file_name(&self) -> String {
        format!("enhanced.{}", self.format.extension())
    }
}

/// Result blobs keyed by job id.
///
/// A second `put` for the same id is rejected with [`StoreError::AlreadyStored`]
/// and the first blob stays in place.
#[derive(Default)]
pub struct ResultStore {
    blobs: RwLock<HashMap<JobId, ResultBlob>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, id: &str, blob: ResultBlob) -> Result<(), StoreError> {
        let mut blobs = self.blobs.write().map_err(|e| {
            tracing::error!("RwLock poisoned writing result store: {e}");
            StoreError::Poisoned
        })?;
        match blobs.entry(id.to_string()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyStored(id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(blob);
                Ok(())
            }
        }
    }

    /// Cheap clone of the stored blob (`Bytes` is reference counted).
    pub fn get(&self, id: &str) -> Result<ResultBlob, StoreError> {
        let blobs = self.blobs.read().map_err(|e| {
            tracing::error!("RwLock poisoned reading result store: {e}");
            StoreError::Poisoned
        })?;
        blobs
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.blobs
            .read()
            .map(|blobs| blobs.contains_key(id))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.blobs.read().map(|blobs| blobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
