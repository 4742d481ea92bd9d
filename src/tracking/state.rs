//! Seed/track state machine states.

/// State of the displacement tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    /// Waiting for a frame to detect a fresh seed set in.
    AcquireSeed,
    /// Tracking the current point set. `iteration` counts the TRACK steps
    /// already completed in this epoch.
    Track { iteration: usize },
}

impl Default for TrackerState {
    fn default() -> Self {
        Self::AcquireSeed
    }
}
