// crates/server/src/jobs/scheduler.rs
//! Drives each submitted job through its stages on a background task.

use std::sync::Arc;
use std::time::Instant;

use image::DynamicImage;
use image_refine_core::{encode, EnhanceError, Enhancer, OutputFormat};
use thiserror::Error;

use super::registry::{JobRegistry, RegistryError};
use super::stages::{StagePlan, StageWork};
use super::store::{ResultBlob, ResultStore, StoreError};
use super::types::{new_job_id, JobId, JobUpdate};
use crate::metrics::{record_job_finished, record_job_submitted, JobOutcome};

/// Why a job ended in `failed`.
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Pipeline(#[from] EnhanceError),

    #[error("Enhancement task aborted: {0}")]
    TaskAborted(String),

    #[error("Stage plan has no enhancement stage")]
    NoOutput,

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Registers jobs and spawns one task per job to advance it.
///
/// `submit` returns as soon as the record exists; the task is never awaited
/// by the caller. Cloning is cheap and shares the same registry and store.
#[derive(Clone)]
pub struct ProgressScheduler {
    registry: Arc<JobRegistry>,
    results: Arc<ResultStore>,
    enhancer: Arc<dyn Enhancer>,
    plan: StagePlan,
    format: OutputFormat,
}

impl ProgressScheduler {
    pub fn new(
        registry: Arc<JobRegistry>,
        results: Arc<ResultStore>,
        enhancer: Arc<dyn Enhancer>,
        plan: StagePlan,
    ) -> Self {
        Self {
            registry,
            results,
            enhancer,
            plan,
            format: OutputFormat::Png,
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn results(&self) -> &Arc<ResultStore> {
        &self.results
    }

    pub fn plan(&self) -> &StagePlan {
        &self.plan
    }

    /// Create a `queued` job for `image` and start driving it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, image: DynamicImage) -> Result<JobId, RegistryError> {
        let id = new_job_id();
        self.registry.create(&id)?;
        record_job_submitted();
        tracing::info!(
            job_id = %id,
            width = image.width(),
            height = image.height(),
            enhancer = self.enhancer.name(),
            "Job submitted"
        );

        let task = JobTask {
            id: id.clone(),
            scheduler: self.clone(),
        };
        tokio::spawn(task.run(image));
        Ok(id)
    }
}

/// The single writer for one job id.
struct JobTask {
    id: JobId,
    scheduler: ProgressScheduler,
}

impl JobTask {
    async fn run(self, image: DynamicImage) {
        let started = Instant::now();
        match self.drive(image).await {
            Ok(()) => {
                tracing::info!(
                    job_id = %self.id,
                    duration_secs = started.elapsed().as_secs_f64(),
                    "Job completed"
                );
                record_job_finished(JobOutcome::Completed, started.elapsed());
            }
            Err(e) => {
                tracing::warn!(job_id = %self.id, error = %e, "Job failed");
                if let Err(update_err) = self
                    .scheduler
                    .registry
                    .update(&self.id, JobUpdate::failed(e.to_string()))
                {
                    tracing::error!(
                        job_id = %self.id,
                        error = %update_err,
                        "Could not record job failure"
                    );
                }
                record_job_finished(JobOutcome::Failed, started.elapsed());
            }
        }
    }

    async fn drive(&self, image: DynamicImage) -> Result<(), JobError> {
        let registry = &self.scheduler.registry;
        let mut pending = Some(image);
        let mut output = None;

        for stage in self.scheduler.plan.stages() {
            registry.update(&self.id, JobUpdate::stage(stage))?;
            tracing::debug!(job_id = %self.id, stage = %stage.status, progress = stage.progress, "Stage entered");

            if stage.work == StageWork::Enhance {
                if let Some(image) = pending.take() {
                    output = Some(self.enhance(image).await?);
                }
            }
            if !stage.pacing.is_zero() {
                tokio::time::sleep(stage.pacing).await;
            }
        }

        let bytes = output.ok_or(JobError::NoOutput)?;
        self.scheduler
            .results
            .put(&self.id, ResultBlob::new(bytes, self.scheduler.format))?;
        registry.update(&self.id, JobUpdate::completed())?;
        Ok(())
    }

    /// Run the pipeline and encode on the blocking pool so polls stay responsive.
    async fn enhance(&self, image: DynamicImage) -> Result<Vec<u8>, JobError> {
        let enhancer = Arc::clone(&self.scheduler.enhancer);
        let format = self.scheduler.format;
        let started = Instant::now();

        let encoded = tokio::task::spawn_blocking(move || {
            let enhanced = enhancer.enhance(&image)?;
            encode(&enhanced, format)
        })
        .await
        .map_err(|e| JobError::TaskAborted(e.to_string()))??;

        tracing::debug!(
            job_id = %self.id,
            bytes = encoded.len(),
            duration_secs = started.elapsed().as_secs_f64(),
            "Enhancement finished"
        );
        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::types::{JobRecord, JobStatus};
    use image::{Rgb, RgbImage};
    use image_refine_core::StandardEnhancer;
    use std::time::Duration;

    struct FailingEnhancer;

    impl Enhancer for FailingEnhancer {
        fn enhance(&self, _image: &DynamicImage) -> Result<DynamicImage, EnhanceError> {
            Err(EnhanceError::Pipeline("kernel exploded".into()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct PanickingEnhancer;

    impl Enhancer for PanickingEnhancer {
        fn enhance(&self, _image: &DynamicImage) -> Result<DynamicImage, EnhanceError> {
            panic!("filter bug");
        }

        fn name(&self) -> &str {
            "panicking"
        }
    }

    fn scheduler_with(enhancer: Arc<dyn Enhancer>, plan: StagePlan) -> ProgressScheduler {
        ProgressScheduler::new(
            Arc::new(JobRegistry::new()),
            Arc::new(ResultStore::new()),
            enhancer,
            plan,
        )
    }

    fn sample_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 3 % 256) as u8, (y * 5 % 256) as u8, 128])
        }))
    }

    async fn wait_for_terminal(registry: &JobRegistry, id: &str) -> JobRecord {
        tokio::time::timeout(Duration::from_secs(30), async {
            loop {
                let record = registry.get(id).unwrap();
                if record.status.is_terminal() {
                    return record;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("job did not reach a terminal status")
    }

    #[tokio::test]
    async fn test_job_runs_to_completion() {
        let scheduler = scheduler_with(Arc::new(StandardEnhancer::default()), StagePlan::immediate());
        let id = scheduler.submit(sample_image(32, 24)).unwrap();

        let record = wait_for_terminal(scheduler.registry(), &id).await;
        assert_eq!(record.status, JobStatus::Completed);
        assert_eq!(record.progress, 100);
        assert_eq!(record.message, "Done");
        assert!(record.error.is_none());

        let blob = scheduler.results().get(&id).unwrap();
        assert_eq!(blob.format, OutputFormat::Png);
        let decoded = image::load_from_memory(&blob.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 24));
    }

    #[tokio::test]
    async fn test_submit_returns_before_any_stage_completes() {
        let plan = StagePlan::new(
            Duration::from_millis(300),
            Duration::from_millis(10),
            Duration::from_millis(10),
        );
        let scheduler = scheduler_with(Arc::new(StandardEnhancer::default()), plan);
        let id = scheduler.submit(sample_image(8, 8)).unwrap();

        let record = scheduler.registry().get(&id).unwrap();
        assert!(
            matches!(record.status, JobStatus::Queued | JobStatus::Analyzing),
            "unexpected status {}",
            record.status
        );
        assert!(!scheduler.results().contains(&id));
    }

    #[tokio::test]
    async fn test_stage_events_are_ordered() {
        let scheduler = scheduler_with(Arc::new(StandardEnhancer::default()), StagePlan::immediate());
        let mut rx = scheduler.registry().subscribe();
        let id = scheduler.submit(sample_image(8, 8)).unwrap();

        let mut trace = Vec::new();
        while let Ok(event) = tokio::time::timeout(Duration::from_secs(10), rx.recv()).await {
            let event = event.unwrap();
            assert_eq!(event.job_id, id);
            trace.push((event.record.status, event.record.progress));
            if event.record.status.is_terminal() {
                break;
            }
        }

        assert_eq!(
            trace,
            vec![
                (JobStatus::Queued, 0),
                (JobStatus::Analyzing, 10),
                (JobStatus::Enhancing, 45),
                (JobStatus::Finalizing, 80),
                (JobStatus::Completed, 100),
            ]
        );
    }

    #[tokio::test]
    async fn test_pipeline_error_fails_job_without_result() {
        let scheduler = scheduler_with(Arc::new(FailingEnhancer), StagePlan::immediate());
        let id = scheduler.submit(sample_image(8, 8)).unwrap();

        let record = wait_for_terminal(scheduler.registry(), &id).await;
        assert_eq!(record.status, JobStatus::Failed);
        assert_eq!(record.progress, 80);
        assert!(record.error.unwrap().contains("kernel exploded"));
        assert!(!scheduler.results().contains(&id));
    }

    #[tokio::test]
    async fn test_pipeline_panic_fails_job() {
        let scheduler = scheduler_with(Arc::new(PanickingEnhancer), StagePlan::immediate());
        let id = scheduler.submit(sample_image(8, 8)).unwrap();

        let record = wait_for_terminal(scheduler.registry(), &id).await;
        assert_eq!(record.status, JobStatus::Failed);
        assert!(record.error.unwrap().starts_with("Enhancement task aborted"));
        assert!(!scheduler.results().contains(&id));
    }

    #[tokio::test]
    async fn test_failed_job_does_not_affect_others() {
        let registry = Arc::new(JobRegistry::new());
        let results = Arc::new(ResultStore::new());
        let good = ProgressScheduler::new(
            Arc::clone(&registry),
            Arc::clone(&results),
            Arc::new(StandardEnhancer::default()),
            StagePlan::immediate(),
        );
        let bad = ProgressScheduler::new(
            Arc::clone(&registry),
            Arc::clone(&results),
            Arc::new(FailingEnhancer),
            StagePlan::immediate(),
        );

        let bad_id = bad.submit(sample_image(8, 8)).unwrap();
        let good_id = good.submit(sample_image(8, 8)).unwrap();

        assert_eq!(wait_for_terminal(&registry, &bad_id).await.status, JobStatus::Failed);
        assert_eq!(wait_for_terminal(&registry, &good_id).await.status, JobStatus::Completed);
        assert!(results.contains(&good_id));
        assert!(!results.contains(&bad_id));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_many_jobs_complete_concurrently() {
        let scheduler = scheduler_with(
            Arc::new(StandardEnhancer::default()),
            StagePlan::new(
                Duration::from_millis(20),
                Duration::from_millis(20),
                Duration::from_millis(20),
            ),
        );

        let ids: Vec<JobId> = (0..10)
            .map(|_| scheduler.submit(sample_image(40, 30)).unwrap())
            .collect();
        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), 10);

        for id in &ids {
            let record = wait_for_terminal(scheduler.registry(), id).await;
            assert_eq!(record.status, JobStatus::Completed);
        }
        assert_eq!(scheduler.results().len(), 10);
    }

    #[tokio::test]
    async fn test_terminal_state_is_stable() {
        let scheduler = scheduler_with(Arc::new(StandardEnhancer::default()), StagePlan::immediate());
        let id = scheduler.submit(sample_image(8, 8)).unwrap();

        let first = wait_for_terminal(scheduler.registry(), &id).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = scheduler.registry().get(&id).unwrap();
        assert_eq!(first, second);
    }
}
