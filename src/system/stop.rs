//! Run-loop stop conditions.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable cancellation flag checked once per run-loop iteration.
///
/// Any clone may request the stop, e.g. from a signal handler thread.
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    stop_requested: Arc<AtomicBool>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the run loop to finish after the current frame.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }
}

/// Bounds on how long the run loop may go on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunLimits {
    /// Stop after this many frames have been processed. `None` runs until
    /// the source ends or a stop is requested.
    pub max_frames: Option<u64>,
}

impl RunLimits {
    pub fn unbounded() -> Self {
        Self { max_frames: None }
    }

    pub fn frames(max_frames: u64) -> Self {
        Self {
            max_frames: Some(max_frames),
        }
    }

    pub fn reached(&self, frames: u64) -> bool {
        self.max_frames.is_some_and(|max| frames >= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_token_shared_between_clones() {
        let token = StopToken::new();
        let other = token.clone();
        assert!(!token.is_stop_requested());
        other.request_stop();
        assert!(token.is_stop_requested());
    }

    #[test]
    fn test_run_limits() {
        assert!(!RunLimits::unbounded().reached(u64::MAX));
        let limits = RunLimits::frames(3);
        assert!(!limits.reached(2));
        assert!(limits.reached(3));
    }
}
