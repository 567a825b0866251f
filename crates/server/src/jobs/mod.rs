// crates/server/src/jobs/mod.rs
//! Background job system for refine requests.
//!
//! Provides:
//! - `JobRegistry`: keyed job records with broadcast progress
//! - `ResultStore`: write-once storage of encoded results
//! - `ProgressScheduler`: one spawned task per job, stage by stage
//! - `StagePlan`: the ordered stages and their pacing

pub mod registry;
pub mod scheduler;
pub mod stages;
pub mod store;
pub mod types;

pub use registry::{JobRegistry, RegistryError};
pub use scheduler::{JobError, ProgressScheduler};
pub use stages::{Stage, StagePlan, StageWork, MAX_PACING_SCALE};
pub use store::{ResultBlob, ResultStore, StoreError};
pub use types::{new_job_id, JobId, JobProgress, JobRecord, JobStatus, JobUpdate};
