//! Displacement tracker: seed, track, accumulate, re-seed.
//!
//! One call to [`DisplacementTracker::process_frame`] per frame:
//! - `AcquireSeed`: detect corners in the frame. An empty set keeps the
//!   tracker in `AcquireSeed` for the next frame.
//! - `Track`: follow the current points from the previous frame into this
//!   one, average the survivors' shift, scale it to physical units and add
//!   it to the accumulator. Survivors become the next point set.
//! - An epoch ends after `iterations_per_seed` successful steps, or as soon
//!   as a step loses every point. Either way the next frame is re-seeded.
//!
//! Contributions already added earlier in an abandoned epoch are kept.

use anyhow::Result;
use nalgebra::Vector2;
use tracing::debug;

use crate::config::OdometryConfig;
use crate::tracking::TrackerState;
use crate::tracking::displacement::{DisplacementAccumulator, Survivors};
use crate::tracking::result::{StepOutcome, TrackedStep};
use crate::vision::{CornerDetector, SparseOpticalFlow, TrackPoint};

/// Sparse-flow planar displacement estimator.
///
/// Generic over the image type `I` so the state machine can be driven by
/// OpenCV `Mat`s in production and by scripted fakes in tests.
pub struct DisplacementTracker<I, D, F> {
    config: OdometryConfig,
    /// Cached `config.scale_factor()`.
    scale: f64,
    detector: D,
    flow: F,

    state: TrackerState,
    /// Points tracked *from* in the next TRACK step.
    points: Vec<TrackPoint>,
    /// Most recent frame; the reference image for the next TRACK step.
    last_frame: Option<I>,

    accumulator: DisplacementAccumulator,
}

impl<I, D, F> DisplacementTracker<I, D, F>
where
    D: CornerDetector<I>,
    F: SparseOpticalFlow<I>,
{
    pub fn new(config: OdometryConfig, detector: D, flow: F) -> Result<Self> {
        config.validate()?;
        let scale = config.scale_factor();
        Ok(Self {
            config,
            scale,
            detector,
            flow,
            state: TrackerState::AcquireSeed,
            points: Vec::new(),
            last_frame: None,
            accumulator: DisplacementAccumulator::new(),
        })
    }

    /// Advance the state machine by one frame.
    ///
    /// Errors only come from the detector or flow tracker implementations;
    /// missing corners and lost tracks are reported through the outcome.
    pub fn process_frame(&mut self, frame: I) -> Result<StepOutcome> {
        let outcome = match self.state {
            TrackerState::AcquireSeed => self.acquire_seed(&frame)?,
            TrackerState::Track { iteration } => match self.last_frame.as_ref() {
                Some(prev) => {
                    let tracks = self.flow.track(prev, &frame, &self.points)?;
                    let survivors = Survivors::select(&self.points, &tracks);
                    self.track_step(iteration, survivors)
                }
                // Unreachable through the public API; treat as a fresh start.
                None => self.acquire_seed(&frame)?,
            },
        };
        self.last_frame = Some(frame);
        Ok(outcome)
    }

    fn acquire_seed(&mut self, frame: &I) -> Result<StepOutcome> {
        let seeds = self.detector.detect(frame)?;
        if seeds.is_empty() {
            debug!("No corners detected, retrying on next frame");
            self.points.clear();
            self.state = TrackerState::AcquireSeed;
            return Ok(StepOutcome::NoSeeds);
        }

        debug!("Seeded {} points", seeds.len());
        self.points = seeds.clone();
        self.state = TrackerState::Track { iteration: 0 };
        Ok(StepOutcome::Seeded { seeds })
    }

    fn track_step(&mut self, iteration: usize, survivors: Survivors) -> StepOutcome {
        let iteration = iteration + 1;
        let lost = self.points.len() - survivors.len();

        let Some(pixel_shift) = survivors.mean_shift() else {
            debug!(
                "All {} points lost at iteration {}, re-seeding",
                lost, iteration
            );
            self.points.clear();
            self.state = TrackerState::AcquireSeed;
            return StepOutcome::EpochAbandoned { iteration, lost };
        };

        let displacement: Vector2<f64> = pixel_shift * self.scale;
        self.accumulator.add(displacement);

        let epoch_complete = iteration >= self.config.iterations_per_seed;
        self.state = if epoch_complete {
            TrackerState::AcquireSeed
        } else {
            TrackerState::Track { iteration }
        };

        self.points = survivors.current.clone();
        if epoch_complete {
            debug!(
                "Epoch complete after {} iterations ({} points left)",
                iteration,
                self.points.len()
            );
            self.points.clear();
        }

        StepOutcome::Tracked(TrackedStep {
            iteration,
            survivors,
            lost,
            pixel_shift,
            displacement,
            total: self.accumulator.total(),
            epoch_complete,
        })
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Accumulated displacement `(dx, dy)` in physical units.
    pub fn total(&self) -> Vector2<f64> {
        self.accumulator.total()
    }

    pub fn accumulator(&self) -> &DisplacementAccumulator {
        &self.accumulator
    }

    /// Points that the next TRACK step will track from.
    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    /// The frame most recently passed to [`Self::process_frame`].
    pub fn last_frame(&self) -> Option<&I> {
        self.last_frame.as_ref()
    }

    pub fn config(&self) -> &OdometryConfig {
        &self.config
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale
    }
}
