//! Rerun-based visualization of the displacement tracker.
//!
//! Entity hierarchy:
//!     status               - Text status with epoch, survivor count and totals
//!     camera/
//!         image            - Grayscale input frame
//!         image/seeds      - Freshly detected seed corners (yellow dots)
//!         image/survivors  - Tracked points (red dots)
//!         image/flow       - Per-point motion of the last step (red segments)
//!     world/
//!         trajectory       - Accumulated planar displacement (gray line)
//!     plots/
//!         survivors        - Temporal plot
//!         step_dx          - Temporal plot
//!         step_dy          - Temporal plot
//!         track_error      - Mean LK residual of the survivors

use anyhow::Result;
use nalgebra::Vector2;
use opencv::core::Mat;
use opencv::prelude::*;

use crate::tracking::{StepOutcome, TrackedStep};
use crate::viz::{ObserverSignal, TrackingObserver};
use crate::vision::TrackPoint;

pub struct RerunVisualizer {
    rec: rerun::RecordingStream,
    frame_index: i64,
    trajectory: Vec<[f32; 2]>,
}

impl RerunVisualizer {
    /// Spawn a Rerun viewer in a separate process and connect to it.
    pub fn new(app_name: &str) -> Result<Self> {
        let rec = rerun::RecordingStreamBuilder::new(app_name).spawn()?;
        Ok(Self {
            rec,
            frame_index: 0,
            trajectory: vec![[0.0, 0.0]],
        })
    }

    /// Log the grayscale input image.
    pub fn log_image_feed(&self, image: &Mat) {
        if let Ok((data, width, height)) = mat_to_image_data(image) {
            self.rec
                .log("camera/image", &rerun::Image::from_l8(data, [width, height]))
                .ok();
        }
    }

    /// Log a fresh seed set as yellow dots.
    pub fn log_seeds(&self, seeds: &[TrackPoint]) {
        self.rec
            .log(
                "camera/image/seeds",
                &rerun::Points2D::new(to_points(seeds))
                    .with_colors([[255u8, 220, 0]]) // Yellow
                    .with_radii([3.0f32]),
            )
            .ok();
    }

    /// Log survivors, their motion segments and the temporal plots for one step.
    pub fn log_tracked_step(&self, step: &TrackedStep) {
        let survivors = &step.survivors;
        self.rec
            .log(
                "camera/image/survivors",
                &rerun::Points2D::new(to_points(&survivors.current))
                    .with_colors([[255u8, 0, 0]]) // Red
                    .with_radii([3.0f32]),
            )
            .ok();

        let segments: Vec<Vec<[f32; 2]>> = survivors
            .previous
            .iter()
            .zip(&survivors.current)
            .map(|(old, new)| vec![[old.x, old.y], [new.x, new.y]])
            .collect();
        self.rec
            .log(
                "camera/image/flow",
                &rerun::LineStrips2D::new(segments).with_colors([[255u8, 0, 0]]),
            )
            .ok();

        self.rec
            .log(
                "plots/survivors",
                &rerun::Scalars::new([survivors.len() as f64]),
            )
            .ok();
        self.rec
            .log("plots/step_dx", &rerun::Scalars::new([step.displacement.x]))
            .ok();
        self.rec
            .log("plots/step_dy", &rerun::Scalars::new([step.displacement.y]))
            .ok();
        if let Some(error) = survivors.mean_error() {
            self.rec
                .log("plots/track_error", &rerun::Scalars::new([error as f64]))
                .ok();
        }
    }

    /// Log the accumulated displacement path as a thin gray line.
    pub fn log_trajectory(&self) {
        if self.trajectory.len() < 2 {
            return;
        }
        self.rec
            .log(
                "world/trajectory",
                &rerun::LineStrips2D::new([self.trajectory.clone()])
                    .with_colors([[128u8, 128, 128]]) // Gray
                    .with_radii([0.005f32]), // Thin
            )
            .ok();
    }

    fn log_status(&self, outcome: &StepOutcome, total: Vector2<f64>) {
        let state = match outcome {
            StepOutcome::Seeded { seeds } => format!("**SEEDED** {} corners", seeds.len()),
            StepOutcome::NoSeeds => "**NO CORNERS**".to_string(),
            StepOutcome::Tracked(step) => {
                let mut text = format!(
                    "**TRACKING** iteration {} | survivors {} | lost {}",
                    step.iteration,
                    step.survivors.len(),
                    step.lost
                );
                if let Some(error) = step.survivors.mean_error() {
                    text.push_str(&format!(" | LK error {:.2}", error));
                }
                text
            }
            StepOutcome::EpochAbandoned { iteration, .. } => {
                format!("**LOST** at iteration {}", iteration)
            }
        };
        let status_text = format!("{} | dx: {:.4} | dy: {:.4}", state, total.x, total.y);
        self.rec
            .log(
                "status",
                &rerun::TextDocument::new(status_text)
                    .with_media_type(rerun::MediaType::markdown()),
            )
            .ok();
    }
}

impl TrackingObserver<Mat> for RerunVisualizer {
    fn observe(
        &mut self,
        frame: &Mat,
        outcome: &StepOutcome,
        total: Vector2<f64>,
    ) -> Result<ObserverSignal> {
        self.rec.set_time_sequence("frame", self.frame_index);
        self.frame_index += 1;

        self.log_image_feed(frame);
        self.log_status(outcome, total);

        match outcome {
            StepOutcome::Seeded { seeds } => self.log_seeds(seeds),
            StepOutcome::Tracked(step) => {
                self.log_tracked_step(step);
                self.trajectory.push([total.x as f32, total.y as f32]);
                self.log_trajectory();
            }
            StepOutcome::NoSeeds | StepOutcome::EpochAbandoned { .. } => {}
        }

        Ok(ObserverSignal::Continue)
    }
}

fn to_points(points: &[TrackPoint]) -> Vec<[f32; 2]> {
    points.iter().map(|p| [p.x, p.y]).collect()
}

/// Convert OpenCV Mat to image data (bytes, width, height)
fn mat_to_image_data(mat: &Mat) -> Result<(Vec<u8>, u32, u32), opencv::Error> {
    let rows = mat.rows() as u32;
    let cols = mat.cols() as u32;

    let data = mat.data_bytes()?;
    Ok((data.to_vec(), cols, rows))
}
