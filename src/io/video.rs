//! Live camera or video file input through OpenCV `VideoCapture`.

use std::path::Path;

use anyhow::{Context, Result, bail};
use opencv::core::Mat;
use opencv::prelude::*;
use opencv::{imgproc, videoio};
use tracing::{info, warn};

use crate::vision::FrameSource;

/// Grayscale frames from a capture device or a video file.
pub struct VideoSource {
    capture: videoio::VideoCapture,
    frame: Mat,
    description: String,
}

impl VideoSource {
    /// Open camera `index` (0 is usually the built-in webcam).
    pub fn open_camera(index: i32) -> Result<Self> {
        let capture = videoio::VideoCapture::new(index, videoio::CAP_ANY)
            .with_context(|| format!("Failed to open camera {}", index))?;
        Self::from_capture(capture, format!("camera {}", index))
    }

    /// Open a video file.
    pub fn open_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path
            .to_str()
            .with_context(|| format!("Non UTF-8 video path {:?}", path))?;
        let capture = videoio::VideoCapture::from_file(path_str, videoio::CAP_ANY)
            .with_context(|| format!("Failed to open video {:?}", path))?;
        Self::from_capture(capture, format!("video {}", path.display()))
    }

    fn from_capture(capture: videoio::VideoCapture, description: String) -> Result<Self> {
        if !capture.is_opened()? {
            bail!("Failed to open {}", description);
        }
        info!("Opened {}", description);
        Ok(Self {
            capture,
            frame: Mat::default(),
            description,
        })
    }
}

impl FrameSource for VideoSource {
    type Image = Mat;

    fn next_frame(&mut self) -> Result<Option<Mat>> {
        let grabbed = self
            .capture
            .read(&mut self.frame)
            .with_context(|| format!("Failed to read from {}", self.description))?;
        if !grabbed || self.frame.empty() {
            warn!("{} returned no frame, ending stream", self.description);
            return Ok(None);
        }

        if self.frame.channels() == 1 {
            return Ok(Some(self.frame.try_clone()?));
        }

        let mut gray = Mat::default();
        imgproc::cvt_color_def(&self.frame, &mut gray, imgproc::COLOR_BGR2GRAY)
            .context("Failed to convert frame to grayscale")?;
        Ok(Some(gray))
    }
}
