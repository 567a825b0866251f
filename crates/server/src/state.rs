// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;

use image_refine_core::{Enhancer, StandardEnhancer};

use crate::config::ServerConfig;
use crate::jobs::{JobRegistry, ProgressScheduler, ResultStore};

/// Shared application state accessible from all route handlers.
///
/// Every instance owns its own registry and store, so tests get isolated state.
pub struct AppState {
    /// Job records, polled by `/api/status`.
    pub jobs: Arc<JobRegistry>,
    /// Finished images, served by `/api/result`.
    pub results: Arc<ResultStore>,
    /// Spawns and drives one task per submitted job.
    pub scheduler: ProgressScheduler,
    /// Resolved settings (body limit, pacing, enhancement parameters).
    pub config: ServerConfig,
}

impl AppState {
    /// Create a new application state wrapped in an Arc for sharing.
    pub fn new(config: ServerConfig) -> Arc<Self> {
        let enhancer = Arc::new(StandardEnhancer::new(config.enhance.clone()));
        Self::with_enhancer(config, enhancer)
    }

    /// Create with a custom pipeline (tests drive failure paths this way).
    pub fn with_enhancer(config: ServerConfig, enhancer: Arc<dyn Enhancer>) -> Arc<Self> {
        let jobs = Arc::new(JobRegistry::new());
        let results = Arc::new(ResultStore::new());
        let scheduler = ProgressScheduler::new(
            Arc::clone(&jobs),
            Arc::clone(&results),
            enhancer,
            config.plan.clone(),
        );
        Arc::new(Self {
            jobs,
            results,
            scheduler,
            config,
        })
    }
}
