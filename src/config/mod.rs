//! Fixed configuration for the displacement tracker.
//!
//! Values are resolved once (defaults, optionally overridden by a YAML file)
//! and handed to the tracker at construction. Nothing here is mutated while
//! the tracker runs.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

/// Complete tracker configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OdometryConfig {
    pub geometry: GeometryConfig,
    /// Maximum number of TRACK iterations before re-seeding.
    pub iterations_per_seed: usize,
    pub corners: CornerConfig,
    pub flow: FlowConfig,
}

impl Default for OdometryConfig {
    fn default() -> Self {
        Self {
            geometry: GeometryConfig::default(),
            iterations_per_seed: 5,
            corners: CornerConfig::default(),
            flow: FlowConfig::default(),
        }
    }
}

impl OdometryConfig {
    /// Load a configuration from YAML. Missing fields keep their defaults.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        let config: OdometryConfig = serde_yaml::from_reader(file)
            .with_context(|| format!("Failed to parse {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: OdometryConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the tracker cannot work with.
    pub fn validate(&self) -> Result<()> {
        self.geometry.validate()?;
        if self.iterations_per_seed == 0 {
            bail!("iterations_per_seed must be at least 1");
        }
        self.corners.validate()?;
        self.flow.validate()?;
        Ok(())
    }

    /// Multiplier from mean pixel displacement to physical length.
    pub fn scale_factor(&self) -> f64 {
        self.geometry.scale_factor()
    }
}

/// Pinhole geometry of a camera looking at a flat scene at constant depth.
///
/// All three lengths share one unit (the default rig is in centimetres);
/// the accumulated displacement comes out in that same unit.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// Assumed constant distance from the camera to the tracked surface.
    pub scene_depth: f64,
    /// Focal length of the lens.
    pub focal_length: f64,
    /// Sensor pixel pitch.
    pub length_per_pixel: f64,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            scene_depth: 133.4,
            focal_length: 0.00342,
            length_per_pixel: 0.0000049,
        }
    }
}

impl GeometryConfig {
    /// `(scene_depth / focal_length) * length_per_pixel`
    pub fn scale_factor(&self) -> f64 {
        (self.scene_depth / self.focal_length) * self.length_per_pixel
    }

    fn validate(&self) -> Result<()> {
        let fields = [
            ("scene_depth", self.scene_depth),
            ("focal_length", self.focal_length),
            ("length_per_pixel", self.length_per_pixel),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                bail!("geometry.{} must be a positive number, got {}", name, value);
            }
        }
        Ok(())
    }
}

/// Shi-Tomasi corner detector settings used when seeding.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct CornerConfig {
    /// Upper bound on the seed set size.
    pub max_corners: i32,
    /// Minimum accepted corner response relative to the strongest corner.
    pub quality_level: f64,
    /// Minimum euclidean separation between returned corners (pixels).
    pub min_distance: f64,
    /// Neighbourhood used for the corner response (pixels).
    pub block_size: i32,
    pub use_harris: bool,
    pub harris_k: f64,
}

impl Default for CornerConfig {
    fn default() -> Self {
        Self {
            max_corners: 100,
            quality_level: 0.3,
            min_distance: 7.0,
            block_size: 7,
            use_harris: false,
            harris_k: 0.04,
        }
    }
}

impl CornerConfig {
    fn validate(&self) -> Result<()> {
        if self.max_corners <= 0 {
            bail!("corners.max_corners must be positive, got {}", self.max_corners);
        }
        if !(self.quality_level > 0.0 && self.quality_level <= 1.0) {
            bail!(
                "corners.quality_level must be in (0, 1], got {}",
                self.quality_level
            );
        }
        if self.min_distance < 0.0 {
            bail!("corners.min_distance must not be negative");
        }
        if self.block_size < 1 {
            bail!("corners.block_size must be at least 1");
        }
        Ok(())
    }
}

/// Pyramidal Lucas-Kanade settings used for every TRACK step.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Search window (width, height) per pyramid level.
    pub window_size: (i32, i32),
    /// Highest pyramid level (0 = no pyramid).
    pub max_level: i32,
    /// Termination: iteration cap per point.
    pub max_iterations: i32,
    /// Termination: convergence threshold on the update step.
    pub epsilon: f64,
    /// Points whose spatial gradient matrix is weaker than this are reported lost.
    pub min_eig_threshold: f64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            window_size: (15, 15),
            max_level: 2,
            max_iterations: 10,
            epsilon: 0.03,
            min_eig_threshold: 1e-4,
        }
    }
}

impl FlowConfig {
    fn validate(&self) -> Result<()> {
        let (w, h) = self.window_size;
        if w < 3 || h < 3 {
            bail!("flow.window_size must be at least 3x3, got {}x{}", w, h);
        }
        if self.max_level < 0 {
            bail!("flow.max_level must not be negative");
        }
        if self.max_iterations < 1 && self.epsilon <= 0.0 {
            bail!("flow termination needs an iteration cap or a positive epsilon");
        }
        Ok(())
    }
}
