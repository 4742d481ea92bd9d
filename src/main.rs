use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use opencv::core::Mat;
use tracing::{info, warn};

use flow_odometry::config::OdometryConfig;
use flow_odometry::io::{ImageSequence, VideoSource};
use flow_odometry::system::{OdometryRunner, RunLimits};
use flow_odometry::tracking::DisplacementTracker;
use flow_odometry::vision::{FrameSource, PyramidalLkTracker, ShiTomasiDetector};
use flow_odometry::viz::{HighguiOverlay, RerunVisualizer, StdoutReporter};

const WINDOW_NAME: &str = "frame";

/// Estimate planar camera displacement from sparse optical flow.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Camera device index
    #[arg(long, default_value_t = 0, conflicts_with_all = ["video", "sequence"])]
    camera: i32,

    /// Read frames from a video file instead of a camera
    #[arg(long, conflicts_with = "sequence")]
    video: Option<PathBuf>,

    /// Read frames from a EuRoC-style image directory (data.csv + data/)
    #[arg(long)]
    sequence: Option<PathBuf>,

    /// YAML file overriding the default tracker configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Show tracked points in an OpenCV window (q / Esc to quit)
    #[arg(long)]
    display: bool,

    /// Stream tracking data to a spawned Rerun viewer
    #[arg(long)]
    rerun: bool,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => OdometryConfig::from_yaml_file(path)?,
        None => OdometryConfig::default(),
    };
    info!(
        "Scale factor: {:.6} length units per pixel ({} iterations per seed)",
        config.scale_factor(),
        config.iterations_per_seed
    );

    if let Some(dir) = &args.sequence {
        run(ImageSequence::open(dir)?, config, &args)
    } else if let Some(path) = &args.video {
        run(VideoSource::open_file(path)?, config, &args)
    } else {
        run(VideoSource::open_camera(args.camera)?, config, &args)
    }
}

fn run<S>(source: S, config: OdometryConfig, args: &Args) -> Result<()>
where
    S: FrameSource<Image = Mat>,
{
    let detector = ShiTomasiDetector::new(config.corners);
    let flow = PyramidalLkTracker::new(config.flow)?;
    let tracker = DisplacementTracker::new(config, detector, flow)?;

    let mut runner = OdometryRunner::new(source, tracker)
        .with_observer(Box::new(StdoutReporter::new()))
        .with_limits(RunLimits {
            max_frames: args.max_frames,
        });

    if args.display {
        match HighguiOverlay::new(WINDOW_NAME) {
            Ok(overlay) => runner.add_observer(Box::new(overlay)),
            Err(e) => warn!("Display unavailable, running headless: {:#}", e),
        }
    }
    if args.rerun {
        match RerunVisualizer::new("flow-odometry") {
            Ok(viz) => runner.add_observer(Box::new(viz)),
            Err(e) => warn!("Failed to start Rerun viewer: {:#}", e),
        }
    }

    runner.run()?;
    Ok(())
}
