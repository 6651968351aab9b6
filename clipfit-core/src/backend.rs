use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

use crate::{FFmpegCommand, VideoInfo, get_video_info};

/// The two things the pipelines need from the outside world: reading a
/// video's metadata and running an ffmpeg invocation to completion.
///
/// `FfmpegCli` talks to the real binaries; tests swap in recording fakes.
pub trait MediaBackend {
    fn probe(&self, path: &Path) -> Result<VideoInfo>;

    fn run(&self, command: &FFmpegCommand) -> Result<()>;
}

/// Runs `ffmpeg`/`ffprobe` from `PATH`.
#[derive(Debug, Clone, Default)]
pub struct FfmpegCli {
    show_progress: bool,
}

impl FfmpegCli {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw a progress bar while each encode runs
    pub fn show_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }
}

impl MediaBackend for FfmpegCli {
    fn probe(&self, path: &Path) -> Result<VideoInfo> {
        let info = get_video_info(path)?;
        log::debug!(
            "Probed {:?}: {}x{}, {:.2} fps, {:.3}s, audio: {}",
            path,
            info.width,
            info.height,
            info.fps,
            info.duration,
            if info.has_audio { "yes" } else { "no" }
        );
        Ok(info)
    }

    fn run(&self, command: &FFmpegCommand) -> Result<()> {
        if !self.show_progress {
            return command.execute(|_| {});
        }

        let pb = ProgressBar::new(100);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_message(
            command
                .output()
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );

        let pb_clone = pb.clone();
        let result = command.execute(move |progress| {
            pb_clone.set_position(progress as u64);
        });

        match result {
            Ok(()) => pb.finish_and_clear(),
            Err(_) => pb.abandon(),
        }
        result
    }
}
