//! Clipfit Core - asset preparation for video-comparison galleries
//!
//! This library wraps the FFmpeg command-line tools to:
//! - Convert every GIF under a folder tree to a streaming-friendly MP4
//! - Re-time a set of comparison videos so they all match the duration of
//!   a reference clip (speed change on both video and audio)

pub mod backend;
pub mod duration_adjuster;
pub mod error;
pub mod ffmpeg_wrapper;
pub mod files;
pub mod gif_converter;
pub mod normalizer;

// Re-export commonly used types at the crate root
pub use backend::{FfmpegCli, MediaBackend};
pub use duration_adjuster::{SpeedPlan, adjust_duration, reference_duration};
pub use error::ClipError;
pub use ffmpeg_wrapper::{FFmpegCommand, VideoInfo, check_ffmpeg, get_video_info};
pub use files::FilePattern;
pub use gif_converter::{ConversionSummary, convert_gifs};
pub use normalizer::{NormalizeOptions, NormalizeReport, normalize};
