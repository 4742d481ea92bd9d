//! Vision capabilities consumed by the tracker.
//!
//! The tracker never touches pixels itself. It pulls frames from a
//! [`FrameSource`], asks a [`CornerDetector`] for seed points and a
//! [`SparseOpticalFlow`] for their positions in the next frame. The OpenCV
//! implementations live in [`corners`] and [`lk`]; tests drive the tracker
//! with scripted fakes over plain integer "frames".

pub mod corners;
pub mod lk;

use anyhow::Result;
use nalgebra::Point2;

pub use corners::ShiTomasiDetector;
pub use lk::PyramidalLkTracker;

/// Sub-pixel image coordinate of a tracked feature.
pub type TrackPoint = Point2<f32>;

/// Sequential supplier of grayscale frames.
pub trait FrameSource {
    type Image;

    /// Block until the next frame is available.
    ///
    /// `Ok(None)` means the stream has ended.
    fn next_frame(&mut self) -> Result<Option<Self::Image>>;
}

/// Selects well separated, high quality corners in a grayscale image.
pub trait CornerDetector<I> {
    /// Return the seed points for `image`, strongest first. May be empty.
    fn detect(&mut self, image: &I) -> Result<Vec<TrackPoint>>;
}

/// Relocates points from one grayscale image into the next.
pub trait SparseOpticalFlow<I> {
    /// Track every point of `points` from `prev` into `next`.
    ///
    /// The result has exactly one entry per input point, in input order.
    fn track(&mut self, prev: &I, next: &I, points: &[TrackPoint]) -> Result<Vec<PointTrack>>;
}

/// Outcome of tracking a single point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointTrack {
    /// Position in the next image. Meaningless when `found` is false.
    pub position: TrackPoint,
    pub found: bool,
    /// Tracker specific residual, if the tracker reports one.
    pub error: Option<f32>,
}

impl PointTrack {
    pub fn found(position: TrackPoint) -> Self {
        Self {
            position,
            found: true,
            error: None,
        }
    }

    pub fn lost() -> Self {
        Self {
            position: TrackPoint::origin(),
            found: false,
            error: None,
        }
    }

    pub fn with_error(mut self, error: f32) -> Self {
        self.error = Some(error);
        self
    }
}
