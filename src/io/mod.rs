//! Frame sources: live capture, video files and recorded image sequences.

pub mod euroc;
pub mod video;

pub use euroc::ImageSequence;
pub use video::VideoSource;
