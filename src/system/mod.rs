//! Run-loop orchestration.
//!
//! `OdometryRunner` owns the frame source, the displacement tracker and the
//! observers, and drives them one frame at a time until the source ends or
//! one of the injectable stop conditions fires.

mod runner;
pub mod stop;

pub use runner::{OdometryRunner, RunSummary, StopReason};
pub use stop::{RunLimits, StopToken};
