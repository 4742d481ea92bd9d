//! Pyramidal Lucas-Kanade point tracking backed by OpenCV.

use anyhow::{Context, Result};
use opencv::core::{Mat, Point2f, Size, TermCriteria, TermCriteria_Type, Vector};
use opencv::video;

use crate::config::FlowConfig;
use crate::vision::{PointTrack, SparseOpticalFlow, TrackPoint};

/// `calcOpticalFlowPyrLK` with a fixed window, pyramid depth and termination.
pub struct PyramidalLkTracker {
    window: Size,
    max_level: i32,
    criteria: TermCriteria,
    min_eig_threshold: f64,
    // Scratch buffers reused across calls.
    next_pts: Vector<Point2f>,
    status: Vector<u8>,
    err: Vector<f32>,
}

impl PyramidalLkTracker {
    pub fn new(config: FlowConfig) -> Result<Self> {
        let criteria = TermCriteria::new(
            TermCriteria_Type::COUNT as i32 | TermCriteria_Type::EPS as i32,
            config.max_iterations,
            config.epsilon,
        )?;
        Ok(Self {
            window: Size::new(config.window_size.0, config.window_size.1),
            max_level: config.max_level,
            criteria,
            min_eig_threshold: config.min_eig_threshold,
            next_pts: Vector::new(),
            status: Vector::new(),
            err: Vector::new(),
        })
    }
}

impl SparseOpticalFlow<Mat> for PyramidalLkTracker {
    fn track(&mut self, prev: &Mat, next: &Mat, points: &[TrackPoint]) -> Result<Vec<PointTrack>> {
        if points.is_empty() {
            return Ok(Vec::new());
        }

        let prev_pts: Vector<Point2f> = points.iter().map(|p| Point2f::new(p.x, p.y)).collect();
        self.next_pts.clear();
        self.status.clear();
        self.err.clear();

        video::calc_optical_flow_pyr_lk(
            prev,
            next,
            &prev_pts,
            &mut self.next_pts,
            &mut self.status,
            &mut self.err,
            self.window,
            self.max_level,
            self.criteria,
            0,
            self.min_eig_threshold,
        )
        .context("Optical flow tracking failed")?;

        let tracks = (0..points.len())
            .map(|i| {
                let found = self.status.get(i).map(|s| s > 0).unwrap_or(false);
                match (found, self.next_pts.get(i)) {
                    (true, Ok(p)) => {
                        let track = PointTrack::found(TrackPoint::new(p.x, p.y));
                        match self.err.get(i) {
                            Ok(e) => track.with_error(e),
                            Err(_) => track,
                        }
                    }
                    _ => PointTrack::lost(),
                }
            })
            .collect();

        Ok(tracks)
    }
}
