use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::backend::MediaBackend;
use crate::error::ClipError;
use crate::files::FilePattern;
use crate::FFmpegCommand;

/// Durations closer than this (in seconds) are treated as already matching
pub const DEFAULT_TOLERANCE: f64 = 0.1;

/// How a clip has to be re-timed to hit the target duration
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpeedPlan {
    /// Within tolerance: re-encode at the original speed
    Passthrough,
    /// Play back `factor` times faster (slower when below 1.0)
    Retime { factor: f64 },
}

impl SpeedPlan {
    pub fn for_durations(source: f64, target: f64, tolerance: f64) -> Self {
        if (source - target).abs() <= tolerance {
            SpeedPlan::Passthrough
        } else {
            SpeedPlan::Retime {
                factor: source / target,
            }
        }
    }

    pub fn factor(&self) -> f64 {
        match self {
            SpeedPlan::Passthrough => 1.0,
            SpeedPlan::Retime { factor } => *factor,
        }
    }
}

/// Probes the first file matching `pattern` and returns it with its duration.
pub fn reference_duration(
    backend: &impl MediaBackend,
    pattern: &FilePattern,
) -> Result<(PathBuf, f64)> {
    let reference = pattern
        .matches()?
        .into_iter()
        .next()
        .ok_or_else(|| ClipError::NoReferenceFound(pattern.to_string()))?;

    let duration = backend
        .probe(&reference)
        .with_context(|| format!("Failed to read reference video {:?}", reference))?
        .duration;

    check_duration(&reference, duration)?;
    Ok((reference, duration))
}

/// Durations must be finite and strictly positive for a speed factor to exist
fn check_duration(path: &Path, duration: f64) -> Result<(), ClipError> {
    if !duration.is_finite() || duration <= 0.0 {
        return Err(ClipError::InvalidDuration {
            path: path.to_path_buf(),
            duration,
        });
    }
    Ok(())
}

/// Re-encodes `input` to `output` as H.264/AAC, sped up or slowed down so
/// its duration matches `target` within `tolerance`.
///
/// ffmpeg writes to a temporary file next to `output` that only replaces
/// `output` once the encode succeeded; on any error it is removed again.
/// A zero, negative or non-finite duration on either side is rejected
/// before anything runs.
pub fn adjust_duration(
    backend: &impl MediaBackend,
    input: &Path,
    target: f64,
    output: &Path,
    tolerance: f64,
) -> Result<SpeedPlan> {
    anyhow::ensure!(
        target.is_finite() && target > 0.0,
        "invalid target duration {}s",
        target
    );

    let info = backend
        .probe(input)
        .with_context(|| format!("Failed to read {:?}", input))?;
    check_duration(input, info.duration)?;

    let plan = SpeedPlan::for_durations(info.duration, target, tolerance);
    match plan {
        SpeedPlan::Passthrough => log::debug!(
            "{:?}: {:.3}s already matches {:.3}s, re-encoding only",
            input,
            info.duration,
            target
        ),
        SpeedPlan::Retime { factor } => log::debug!(
            "{:?}: {:.3}s -> {:.3}s (speed x{:.4})",
            input,
            info.duration,
            target,
            factor
        ),
    }

    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staging = tempfile::Builder::new()
        .prefix(".clipfit-")
        .suffix(".mp4")
        .tempfile_in(dir)
        .with_context(|| format!("Failed to create temporary output in {:?}", dir))?
        .into_temp_path();

    let command = encode_command(input, &staging, plan, info.has_audio);
    backend.run(&command)?;

    staging
        .persist(output)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to move encoded file to {:?}", output))?;

    Ok(plan)
}

/// H.264/AAC encode of `input` with the plan's speed change applied
pub fn encode_command(
    input: &Path,
    output: &Path,
    plan: SpeedPlan,
    has_audio: bool,
) -> FFmpegCommand {
    let mut command = FFmpegCommand::new(input, output);
    if let SpeedPlan::Retime { factor } = plan {
        command = command.speed(factor, has_audio);
    }
    command
        .pixel_format("yuv420p")
        .video_codec("libx264")
        .audio_codec("aac")
        .overwrite()
}
