//! Observers of tracker output.
//!
//! Observers see each frame and its [`StepOutcome`] after the tracker has
//! finished with it. They only get shared references, so reporting and
//! drawing cannot influence the displacement estimate.

pub mod overlay;
pub mod rerun;

use std::io::{self, Write};

use anyhow::Result;
use nalgebra::Vector2;

use crate::tracking::StepOutcome;

pub use overlay::HighguiOverlay;
pub use self::rerun::RerunVisualizer;

/// Whether the run loop should keep going after an observer has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverSignal {
    Continue,
    /// The user asked to stop (e.g. pressed `q` in the display window).
    Stop,
}

/// Receives every processed frame together with what the tracker did.
pub trait TrackingObserver<I> {
    /// `total` is the accumulated displacement after this frame.
    fn observe(
        &mut self,
        frame: &I,
        outcome: &StepOutcome,
        total: Vector2<f64>,
    ) -> Result<ObserverSignal>;
}

/// Writes `dx: <v> dy: <v>` once per successful tracking step.
pub struct StdoutReporter<W: Write = io::Stdout> {
    out: W,
}

impl StdoutReporter {
    pub fn new() -> Self {
        Self { out: io::stdout() }
    }
}

impl Default for StdoutReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> StdoutReporter<W> {
    pub fn with_writer(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<I, W: Write> TrackingObserver<I> for StdoutReporter<W> {
    fn observe(
        &mut self,
        _frame: &I,
        outcome: &StepOutcome,
        total: Vector2<f64>,
    ) -> Result<ObserverSignal> {
        if let StepOutcome::Tracked(_) = outcome {
            writeln!(self.out, "dx: {} dy: {}", total.x, total.y)?;
            self.out.flush()?;
        }
        Ok(ObserverSignal::Continue)
    }
}
