//! OpenCV window showing the tracked points and their flow trails.

use anyhow::{Context, Result};
use nalgebra::Vector2;
use opencv::core::{self, Mat, Point, Scalar};
use opencv::prelude::*;
use opencv::{highgui, imgproc};

use crate::tracking::StepOutcome;
use crate::viz::{ObserverSignal, TrackingObserver};
use crate::vision::TrackPoint;

const CIRCLE_RADIUS: i32 = 5;
/// Milliseconds to wait for a key press after each displayed frame.
const KEY_WAIT_MS: i32 = 30;
const KEY_ESC: i32 = 27;

/// Draws survivors as filled dots and their motion as trails that persist
/// for the duration of an epoch.
pub struct HighguiOverlay {
    window: String,
    color: Scalar,
    /// Trail layer, cleared whenever a new seed set is detected.
    trails: Option<Mat>,
}

impl HighguiOverlay {
    pub fn new(window: &str) -> Result<Self> {
        highgui::named_window(window, highgui::WINDOW_AUTOSIZE)
            .with_context(|| format!("Failed to open window {:?}", window))?;
        Ok(Self {
            window: window.to_string(),
            color: Scalar::new(0.0, 0.0, 255.0, 0.0), // BGR red
            trails: None,
        })
    }

    fn reset_trails(&mut self, frame: &Mat) -> Result<()> {
        self.trails = Some(Mat::new_rows_cols_with_default(
            frame.rows(),
            frame.cols(),
            core::CV_8UC3,
            Scalar::all(0.0),
        )?);
        Ok(())
    }

    fn show(&mut self, frame: &Mat, previous: &[TrackPoint], current: &[TrackPoint]) -> Result<()> {
        let mut display = Mat::default();
        if frame.channels() == 1 {
            imgproc::cvt_color_def(frame, &mut display, imgproc::COLOR_GRAY2BGR)?;
        } else {
            display = frame.try_clone()?;
        }

        let size_changed = self
            .trails
            .as_ref()
            .map(|t| t.rows() != frame.rows() || t.cols() != frame.cols())
            .unwrap_or(true);
        if size_changed {
            self.reset_trails(frame)?;
        }

        if let Some(trails) = self.trails.as_mut() {
            for (old, new) in previous.iter().zip(current) {
                imgproc::circle(
                    &mut display,
                    to_pixel(new),
                    CIRCLE_RADIUS,
                    self.color,
                    -1,
                    imgproc::LINE_8,
                    0,
                )?;
                imgproc::line(
                    &mut *trails,
                    to_pixel(old),
                    to_pixel(new),
                    self.color,
                    1,
                    imgproc::LINE_8,
                    0,
                )?;
            }

            let mut composed = Mat::default();
            core::add(&*trails, &display, &mut composed, &core::no_array(), -1)?;
            display = composed;
        }

        highgui::imshow(&self.window, &display)?;
        Ok(())
    }
}

impl TrackingObserver<Mat> for HighguiOverlay {
    fn observe(
        &mut self,
        frame: &Mat,
        outcome: &StepOutcome,
        _total: Vector2<f64>,
    ) -> Result<ObserverSignal> {
        match outcome {
            StepOutcome::Seeded { .. } => {
                self.reset_trails(frame)?;
                Ok(ObserverSignal::Continue)
            }
            StepOutcome::Tracked(step) => {
                self.show(frame, &step.survivors.previous, &step.survivors.current)?;
                let key = highgui::wait_key(KEY_WAIT_MS)?;
                if key == 'q' as i32 || key == KEY_ESC {
                    return Ok(ObserverSignal::Stop);
                }
                Ok(ObserverSignal::Continue)
            }
            StepOutcome::NoSeeds | StepOutcome::EpochAbandoned { .. } => {
                Ok(ObserverSignal::Continue)
            }
        }
    }
}

fn to_pixel(p: &TrackPoint) -> Point {
    Point::new(p.x.round() as i32, p.y.round() as i32)
}
