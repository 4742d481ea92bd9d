//! Shi-Tomasi seed detection backed by OpenCV.

use anyhow::{Context, Result};
use opencv::core::{self, Mat, Point2f, Vector};
use opencv::imgproc;

use crate::config::CornerConfig;
use crate::vision::{CornerDetector, TrackPoint};

/// `goodFeaturesToTrack` over the whole image with a fixed configuration.
pub struct ShiTomasiDetector {
    config: CornerConfig,
    corners: Vector<Point2f>,
}

impl ShiTomasiDetector {
    pub fn new(config: CornerConfig) -> Self {
        Self {
            config,
            corners: Vector::new(),
        }
    }
}

impl CornerDetector<Mat> for ShiTomasiDetector {
    fn detect(&mut self, image: &Mat) -> Result<Vec<TrackPoint>> {
        self.corners.clear();
        imgproc::good_features_to_track(
            image,
            &mut self.corners,
            self.config.max_corners,
            self.config.quality_level,
            self.config.min_distance,
            &core::no_array(),
            self.config.block_size,
            self.config.use_harris,
            self.config.harris_k,
        )
        .context("Corner detection failed")?;

        Ok(self
            .corners
            .iter()
            .map(|p| TrackPoint::new(p.x, p.y))
            .collect())
    }
}
