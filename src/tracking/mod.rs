//! Displacement tracking: the seed/track/accumulate state machine.
//!
//! - Seed selection through a [`CornerDetector`](crate::vision::CornerDetector)
//! - Frame-to-frame point tracking through a
//!   [`SparseOpticalFlow`](crate::vision::SparseOpticalFlow)
//! - Mean-of-survivors pixel shift, scaled to physical units
//! - Epoch bookkeeping (iteration budget, early abandonment)

pub mod displacement;
pub mod result;
pub mod state;
pub mod tracker;

pub use displacement::{DisplacementAccumulator, Survivors};
pub use result::{StepOutcome, TrackedStep};
pub use state::TrackerState;
pub use tracker::DisplacementTracker;

#[cfg(test)]
pub(crate) mod testing;
