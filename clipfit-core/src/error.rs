use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the conversion and normalization pipelines.
///
/// These are wrapped in `anyhow::Error` on their way up, so callers that care
/// about a specific case can `downcast_ref::<ClipError>()`.
#[derive(Error, Debug)]
pub enum ClipError {
    #[error("no reference video matches {0}")]
    NoReferenceFound(String),

    #[error("invalid duration {duration}s for {path:?}")]
    InvalidDuration { path: PathBuf, duration: f64 },

    #[error("ffprobe reported no duration for {0:?}")]
    MissingDuration(PathBuf),

    #[error("unsupported file pattern {0:?} (expected <dir>/*.<ext>)")]
    InvalidPattern(String),

    #[error("ffprobe failed for {path:?}: {message}")]
    Probe { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
