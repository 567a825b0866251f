//! Application metrics for Prometheus monitoring.
//!
//! This module provides:
//! - Prometheus metrics recorder initialization
//! - Job lifecycle counters, gauge and histogram
//! - Rendering for the `/metrics` endpoint
//!
//! Recording is a no-op until [`init_metrics`] installs the recorder, so tests
//! that never call it pay nothing.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// How a job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Failed,
}

impl JobOutcome {
    fn label(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Initialize the Prometheus metrics recorder.
///
/// Returns `true` if initialization succeeded, `false` if already initialized.
pub fn init_metrics() -> bool {
    let mut installed = false;
    PROMETHEUS_HANDLE.get_or_init(|| {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        if metrics::set_global_recorder(recorder).is_err() {
            tracing::warn!("Failed to set global metrics recorder (already set)");
        } else {
            installed = true;
            describe_metrics();
            tracing::info!("Prometheus metrics initialized");
        }
        handle
    });
    installed
}

fn describe_metrics() {
    describe_counter!(
        "refine_jobs_submitted_total",
        "Total number of refine jobs accepted"
    );
    describe_counter!(
        "refine_jobs_finished_total",
        "Total number of refine jobs that reached a terminal status"
    );
    describe_gauge!(
        "refine_jobs_in_flight",
        "Refine jobs currently between submission and a terminal status"
    );
    describe_histogram!(
        "refine_job_duration_seconds",
        "Wall-clock time from submission to terminal status in seconds"
    );
}

/// Render current metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

/// Record an accepted submission.
pub fn record_job_submitted() {
    counter!("refine_jobs_submitted_total").increment(1);
    gauge!("refine_jobs_in_flight").increment(1.0);
}

/// Record a job reaching its terminal status.
pub fn record_job_finished(outcome: JobOutcome, duration: Duration) {
    counter!("refine_jobs_finished_total", "outcome" => outcome.label()).increment(1);
    gauge!("refine_jobs_in_flight").decrement(1.0);
    histogram!("refine_job_duration_seconds", "outcome" => outcome.label())
        .record(duration.as_secs_f64());
}
