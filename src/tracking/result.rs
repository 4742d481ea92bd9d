//! Per-frame outcomes of the displacement tracker.
//!
//! Every call to [`DisplacementTracker::process_frame`] yields exactly one
//! [`StepOutcome`]. Observers read these to report and draw; they carry
//! owned data so they outlive the tracker's internal buffers.
//!
//! [`DisplacementTracker::process_frame`]: crate::tracking::DisplacementTracker::process_frame

use nalgebra::Vector2;

use crate::tracking::displacement::Survivors;
use crate::vision::TrackPoint;

/// What the tracker did with one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// A new epoch started from the detected seed set.
    Seeded { seeds: Vec<TrackPoint> },
    /// Detection found nothing to track; the next frame is tried again.
    NoSeeds,
    /// Tracking succeeded for at least one point.
    Tracked(TrackedStep),
    /// Every point was lost. Nothing was accumulated for this frame and the
    /// next frame is used to re-seed.
    EpochAbandoned {
        /// 1-based TRACK iteration that lost everything.
        iteration: usize,
        lost: usize,
    },
}

impl StepOutcome {
    /// Displacement added to the accumulator by this step, if any.
    pub fn displacement(&self) -> Option<Vector2<f64>> {
        match self {
            Self::Tracked(step) => Some(step.displacement),
            _ => None,
        }
    }
}

/// Details of a successful TRACK iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedStep {
    /// 1-based TRACK iteration within the epoch.
    pub iteration: usize,
    pub survivors: Survivors,
    /// Points dropped in this step.
    pub lost: usize,
    /// Mean survivor shift in pixels.
    pub pixel_shift: Vector2<f64>,
    /// `pixel_shift` in physical units, as added to the accumulator.
    pub displacement: Vector2<f64>,
    /// Accumulated displacement after this step.
    pub total: Vector2<f64>,
    /// True when this step used up the epoch's iteration budget.
    pub epoch_complete: bool,
}
