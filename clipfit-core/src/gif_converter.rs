use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::backend::MediaBackend;
use crate::files::{files_with_extension, mp4_output_path};
use crate::FFmpegCommand;

/// Width every converted GIF is scaled to; height follows the aspect ratio
pub const GIF_TARGET_WIDTH: i32 = 720;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// The ffmpeg invocation turning one GIF into a streaming-friendly MP4
pub fn gif_to_mp4_command(gif: &Path, mp4: &Path) -> FFmpegCommand {
    FFmpegCommand::new(gif, mp4)
        .log_level("error")
        .faststart()
        .pixel_format("yuv420p")
        // -2 keeps the aspect ratio and rounds to an even height for H.264
        .scale(GIF_TARGET_WIDTH, -2)
        .overwrite()
}

/// Converts every GIF under `root` (any depth) to an MP4 next to it.
///
/// A failed file is logged and counted; the batch always runs to the end.
/// Finding no GIFs at all is not an error and yields an empty summary.
pub fn convert_gifs(backend: &impl MediaBackend, root: &Path) -> Result<ConversionSummary> {
    let gifs: Vec<PathBuf> = files_with_extension(root, "gif", true)?;
    if gifs.is_empty() {
        log::warn!("No GIF files found under {:?}", root);
        return Ok(ConversionSummary::default());
    }

    let total = gifs.len();
    log::info!("Found {} GIF files, starting conversion", total);

    let mut summary = ConversionSummary {
        total,
        ..Default::default()
    };

    for (index, gif) in gifs.iter().enumerate() {
        let mp4 = mp4_output_path(gif);
        match backend.run(&gif_to_mp4_command(gif, &mp4)) {
            Ok(()) => {
                log::info!("[{}/{}] converted {}", index + 1, total, mp4.display());
                summary.succeeded += 1;
            }
            Err(e) => {
                log::error!("[{}/{}] failed {}: {:#}", index + 1, total, gif.display(), e);
                summary.failed += 1;
            }
        }
    }

    log::info!(
        "Conversion finished: {} succeeded / {} failed",
        summary.succeeded,
        summary.failed
    );

    Ok(summary)
}
