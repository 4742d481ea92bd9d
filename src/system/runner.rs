//! The frame-by-frame run loop.
//!
//! Pulls one frame at a time from the source, hands it to the tracker and
//! then to every observer. Nothing is buffered ahead; the source's blocking
//! `next_frame` sets the pace.

use anyhow::Result;
use nalgebra::Vector2;
use tracing::info;

use crate::tracking::{DisplacementTracker, StepOutcome};
use crate::vision::{CornerDetector, FrameSource, SparseOpticalFlow};
use crate::viz::{ObserverSignal, TrackingObserver};

use super::stop::{RunLimits, StopToken};

/// Why [`OdometryRunner::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The frame source reported end of stream.
    SourceExhausted,
    /// `RunLimits::max_frames` was reached.
    FrameLimit,
    /// The [`StopToken`] was triggered.
    StopRequested,
    /// An observer asked to stop (user interrupt in the display window).
    ObserverStop,
}

/// Counters collected over one call to [`OdometryRunner::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub frames: u64,
    pub seeds: u64,
    pub empty_seed_frames: u64,
    pub tracked_steps: u64,
    pub abandoned_epochs: u64,
    pub completed_epochs: u64,
    /// Accumulated displacement at the end of the run.
    pub total: Vector2<f64>,
    pub stop_reason: StopReason,
}

impl RunSummary {
    fn new() -> Self {
        Self {
            frames: 0,
            seeds: 0,
            empty_seed_frames: 0,
            tracked_steps: 0,
            abandoned_epochs: 0,
            completed_epochs: 0,
            total: Vector2::zeros(),
            stop_reason: StopReason::SourceExhausted,
        }
    }

    fn record(&mut self, outcome: &StepOutcome) {
        self.frames += 1;
        match outcome {
            StepOutcome::Seeded { .. } => self.seeds += 1,
            StepOutcome::NoSeeds => self.empty_seed_frames += 1,
            StepOutcome::Tracked(step) => {
                self.tracked_steps += 1;
                if step.epoch_complete {
                    self.completed_epochs += 1;
                }
            }
            StepOutcome::EpochAbandoned { .. } => self.abandoned_epochs += 1,
        }
    }
}

/// Owns a frame source, the tracker and the observers, and drives them.
pub struct OdometryRunner<S: FrameSource, D, F> {
    source: S,
    tracker: DisplacementTracker<S::Image, D, F>,
    observers: Vec<Box<dyn TrackingObserver<S::Image>>>,
    limits: RunLimits,
    stop: StopToken,
}

impl<S, D, F> OdometryRunner<S, D, F>
where
    S: FrameSource,
    D: CornerDetector<S::Image>,
    F: SparseOpticalFlow<S::Image>,
{
    pub fn new(source: S, tracker: DisplacementTracker<S::Image, D, F>) -> Self {
        Self {
            source,
            tracker,
            observers: Vec::new(),
            limits: RunLimits::unbounded(),
            stop: StopToken::new(),
        }
    }

    /// Observers run in the order they were added.
    pub fn add_observer(&mut self, observer: Box<dyn TrackingObserver<S::Image>>) {
        self.observers.push(observer);
    }

    pub fn with_observer(mut self, observer: Box<dyn TrackingObserver<S::Image>>) -> Self {
        self.add_observer(observer);
        self
    }

    pub fn with_limits(mut self, limits: RunLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_stop_token(mut self, stop: StopToken) -> Self {
        self.stop = stop;
        self
    }

    /// Token that stops [`Self::run`] after the current frame.
    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    pub fn tracker(&self) -> &DisplacementTracker<S::Image, D, F> {
        &self.tracker
    }

    /// Process frames until the source ends, a limit is hit or a stop is
    /// requested.
    pub fn run(&mut self) -> Result<RunSummary> {
        let mut summary = RunSummary::new();
        info!(
            "Starting displacement tracking (scale factor {:.6} per pixel, {} iterations per seed)",
            self.tracker.scale_factor(),
            self.tracker.config().iterations_per_seed
        );

        summary.stop_reason = loop {
            if self.stop.is_stop_requested() {
                break StopReason::StopRequested;
            }
            if self.limits.reached(summary.frames) {
                break StopReason::FrameLimit;
            }
            let Some(frame) = self.source.next_frame()? else {
                break StopReason::SourceExhausted;
            };

            let outcome = self.tracker.process_frame(frame)?;
            summary.record(&outcome);

            if self.notify_observers(&outcome)? == ObserverSignal::Stop {
                break StopReason::ObserverStop;
            }
        };

        summary.total = self.tracker.total();
        info!(
            "Stopped after {} frames ({:?}): dx={:.4} dy={:.4}, {} tracked steps, {} seeds, {} abandoned epochs",
            summary.frames,
            summary.stop_reason,
            summary.total.x,
            summary.total.y,
            summary.tracked_steps,
            summary.seeds,
            summary.abandoned_epochs
        );
        Ok(summary)
    }

    /// Every observer sees the outcome, even if an earlier one asked to stop.
    fn notify_observers(&mut self, outcome: &StepOutcome) -> Result<ObserverSignal> {
        let Some(frame) = self.tracker.last_frame() else {
            return Ok(ObserverSignal::Continue);
        };
        let total = self.tracker.total();

        let mut signal = ObserverSignal::Continue;
        for observer in self.observers.iter_mut() {
            if observer.observe(frame, outcome, total)? == ObserverSignal::Stop {
                signal = ObserverSignal::Stop;
            }
        }
        Ok(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OdometryConfig;
    use crate::tracking::TrackerState;
    use crate::tracking::testing::{Frame, ScriptedDetector, ShiftFlow, three_corners};
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Yields the listed frame ids, then ends.
    struct VecSource {
        frames: std::vec::IntoIter<Frame>,
    }

    impl VecSource {
        fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
            Self {
                frames: frames.into_iter().collect::<Vec<_>>().into_iter(),
            }
        }
    }

    impl FrameSource for VecSource {
        type Image = Frame;

        fn next_frame(&mut self) -> Result<Option<Frame>> {
            Ok(self.frames.next())
        }
    }

    /// Records what it saw; optionally requests a stop at a given frame.
    struct Recorder {
        seen: Rc<RefCell<Vec<(Frame, Vector2<f64>)>>>,
        stop_at: Option<Frame>,
    }

    impl TrackingObserver<Frame> for Recorder {
        fn observe(
            &mut self,
            frame: &Frame,
            _outcome: &StepOutcome,
            total: Vector2<f64>,
        ) -> Result<ObserverSignal> {
            self.seen.borrow_mut().push((*frame, total));
            if self.stop_at == Some(*frame) {
                return Ok(ObserverSignal::Stop);
            }
            Ok(ObserverSignal::Continue)
        }
    }

    fn runner(
        frames: impl IntoIterator<Item = Frame>,
        detector: ScriptedDetector,
        flow: ShiftFlow,
    ) -> OdometryRunner<VecSource, ScriptedDetector, ShiftFlow> {
        let tracker = DisplacementTracker::new(OdometryConfig::default(), detector, flow).unwrap();
        OdometryRunner::new(VecSource::new(frames), tracker)
    }

    #[test]
    fn test_scripted_scenario_end_to_end() {
        let detector = ScriptedDetector::default().with(0, three_corners());
        let mut r = runner(0..6, detector, ShiftFlow::new(1.0, 0.0));
        let summary = r.run().unwrap();

        let scale = OdometryConfig::default().scale_factor();
        assert_eq!(summary.stop_reason, StopReason::SourceExhausted);
        assert_eq!(summary.frames, 6);
        assert_eq!(summary.seeds, 1);
        assert_eq!(summary.tracked_steps, 5);
        assert_eq!(summary.completed_epochs, 1);
        assert_relative_eq!(summary.total.x, 5.0 * scale, epsilon = 1e-12);
        assert_eq!(summary.total.y, 0.0);
        assert_eq!(r.tracker().state(), TrackerState::AcquireSeed);
    }

    #[test]
    fn test_blank_frames_never_stall() {
        // No frame has corners: every frame is a retry and nothing accumulates.
        let mut r = runner(0..50, ScriptedDetector::default(), ShiftFlow::new(1.0, 1.0));
        let summary = r.run().unwrap();
        assert_eq!(summary.frames, 50);
        assert_eq!(summary.empty_seed_frames, 50);
        assert_eq!(summary.tracked_steps, 0);
        assert_eq!(summary.total, Vector2::zeros());
    }

    #[test]
    fn test_frame_limit() {
        let detector = ScriptedDetector::default().with(0, three_corners());
        let mut r =
            runner(0..100, detector, ShiftFlow::new(0.0, 1.0)).with_limits(RunLimits::frames(3));
        let summary = r.run().unwrap();
        assert_eq!(summary.stop_reason, StopReason::FrameLimit);
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.tracked_steps, 2);
    }

    #[test]
    fn test_stop_token_checked_before_each_frame() {
        let mut r = runner(0..10, ScriptedDetector::default(), ShiftFlow::new(0.0, 0.0));
        r.stop_token().request_stop();
        let summary = r.run().unwrap();
        assert_eq!(summary.stop_reason, StopReason::StopRequested);
        assert_eq!(summary.frames, 0);
    }

    #[test]
    fn test_observers_see_every_frame_and_can_stop() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let detector = ScriptedDetector::default().with(0, three_corners());
        let mut r = runner(0..10, detector, ShiftFlow::new(2.0, 0.0)).with_observer(Box::new(
            Recorder {
                seen: seen.clone(),
                stop_at: Some(3),
            },
        ));
        let summary = r.run().unwrap();

        assert_eq!(summary.stop_reason, StopReason::ObserverStop);
        assert_eq!(summary.frames, 4);
        let frames: Vec<Frame> = seen.borrow().iter().map(|(f, _)| *f).collect();
        assert_eq!(frames, vec![0, 1, 2, 3]);
        let last_total = seen.borrow().last().map(|(_, t)| *t).unwrap();
        assert_eq!(last_total, summary.total);
    }

    #[test]
    fn test_observers_do_not_change_results() {
        let make_detector = || {
            ScriptedDetector::default()
                .with(0, three_corners())
                .with(6, three_corners())
        };

        let mut plain = runner(0..12, make_detector(), ShiftFlow::new(0.5, -0.5));
        let plain_summary = plain.run().unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut observed = runner(0..12, make_detector(), ShiftFlow::new(0.5, -0.5)).with_observer(
            Box::new(Recorder {
                seen: seen.clone(),
                stop_at: None,
            }),
        );
        let observed_summary = observed.run().unwrap();

        assert_eq!(plain_summary, observed_summary);
        assert_eq!(seen.borrow().len(), 12);
    }
}
