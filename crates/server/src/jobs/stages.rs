// crates/server/src/jobs/stages.rs
//! The ordered stages a refine job walks through.

use std::time::Duration;

use super::types::JobStatus;

/// Largest accepted pacing multiplier.
pub const MAX_PACING_SCALE: f64 = 1000.0;

/// What the scheduler does while a stage is current, besides pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageWork {
    /// Nothing but the pacing delay.
    Pace,
    /// Run the enhancement pipeline, then pace.
    Enhance,
}

/// One step of the job lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub status: JobStatus,
    pub progress: u8,
    pub message: &'static str,
    pub work: StageWork,
    /// Delay after entering the stage (and after its work) before moving on.
    pub pacing: Duration,
}

/// Non-terminal stages, in order, with their pacing.
///
/// Progress values are fixed; only the pacing is configurable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePlan {
    stages: [Stage; 3],
}

impl StagePlan {
    pub fn new(analyzing: Duration, enhancing: Duration, finalizing: Duration) -> Self {
        Self {
            stages: [
                Stage {
                    status: JobStatus::Analyzing,
                    progress: 10,
                    message: "Analyzing image...",
                    work: StageWork::Pace,
                    pacing: analyzing,
                },
                Stage {
                    status: JobStatus::Enhancing,
                    progress: 45,
                    message: "Enhancing quality...",
                    work: StageWork::Pace,
                    pacing: enhancing,
                },
                Stage {
                    status: JobStatus::Finalizing,
                    progress: 80,
                    message: "Applying AI enhancements...",
                    work: StageWork::Enhance,
                    pacing: finalizing,
                },
            ],
        }
    }

    /// No pacing at all; stages advance as fast as the pipeline allows.
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, Duration::ZERO)
    }

    /// Default pacing multiplied by `scale`, capped at [`MAX_PACING_SCALE`].
    /// Non-finite or negative scales disable pacing.
    pub fn scaled(scale: f64) -> Self {
        let default = Self::default();
        let scale = if scale.is_finite() && scale > 0.0 {
            scale.min(MAX_PACING_SCALE)
        } else {
            0.0
        };
        let [a, e, f] = default.stages.map(|s| s.pacing.mul_f64(scale));
        Self::new(a, e, f)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Sum of all pacing delays.
    pub fn total_pacing(&self) -> Duration {
        self.stages.iter().map(|s| s.pacing).sum()
    }
}

impl Default for StagePlan {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(1000),
            Duration::from_millis(1500),
            Duration::from_millis(800),
        )
    }
}
