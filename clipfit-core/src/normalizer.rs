use anyhow::Result;
use clap::Args;
use std::path::{Path, PathBuf};

use crate::backend::MediaBackend;
use crate::duration_adjuster::{DEFAULT_TOLERANCE, SpeedPlan, adjust_duration, reference_duration};
use crate::error::ClipError;
use crate::files::{FilePattern, files_with_extension, suffixed_output_path};

/// Category folders of the comparison gallery, in reporting order
pub const DEFAULT_FOLDERS: &[&str] = &[
    "rigid/cogInv",
    "rigid/rave",
    "rigid/bivdiff",
    "rigid/vidtome",
    "rigid/original",
    "rigid/cogv2v",
    "rigid/ours",
    "nonrigid/rave",
    "nonrigid/bivdiff",
    "nonrigid/vidtome",
    "nonrigid/original",
    "nonrigid/cogv2v",
    "nonrigid/coginv",
    "nonrigid/ours",
];

pub const DEFAULT_REFERENCE: &str = "rigid/ours/*.mp4";

pub const DEFAULT_SUFFIX: &str = "_adjusted";

/// Settings for a normalization run
#[derive(Args, Debug, Clone)]
pub struct NormalizeOptions {
    /// Directory the reference pattern and category folders are relative to
    #[arg(long, default_value = ".")]
    pub base_dir: PathBuf,

    /// Reference video pattern; the first match sets the target duration
    #[arg(short, long, default_value = DEFAULT_REFERENCE)]
    pub reference: FilePattern,

    /// Category folder to normalize (repeatable, replaces the default list)
    #[arg(short = 'f', long = "folder", default_values_t = DEFAULT_FOLDERS.iter().map(|f| f.to_string()))]
    pub folders: Vec<String>,

    /// Maximum duration difference in seconds that is left unchanged
    #[arg(short, long, default_value_t = DEFAULT_TOLERANCE)]
    pub tolerance: f64,

    /// Inserted before the extension of every output file
    #[arg(long, default_value = DEFAULT_SUFFIX)]
    pub suffix: String,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            reference: FilePattern::new("rigid/ours", "mp4"),
            folders: DEFAULT_FOLDERS.iter().map(|f| f.to_string()).collect(),
            tolerance: DEFAULT_TOLERANCE,
            suffix: DEFAULT_SUFFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeReport {
    pub reference: PathBuf,
    pub reference_duration: f64,
    pub succeeded: usize,
    pub failed: usize,
    pub retimed: usize,
    pub skipped_folders: Vec<String>,
}

/// Adjusts every `*.mp4` directly inside each category folder to the
/// reference video's duration.
///
/// Returns `Ok(None)` without touching any folder when no reference video
/// exists. Missing folders are skipped; per-file failures are logged and
/// counted but never stop the batch.
pub fn normalize(
    backend: &impl MediaBackend,
    options: &NormalizeOptions,
) -> Result<Option<NormalizeReport>> {
    let pattern = options.reference.relative_to(&options.base_dir);

    let (reference, target) = match reference_duration(backend, &pattern) {
        Ok(found) => found,
        Err(e) if matches!(e.downcast_ref::<ClipError>(), Some(ClipError::NoReferenceFound(_))) => {
            log::error!("No reference video found ({})", pattern);
            return Ok(None);
        }
        Err(e) => return Err(e),
    };
    log::info!("Reference duration: {:.2}s ({})", target, reference.display());

    let mut report = NormalizeReport {
        reference,
        reference_duration: target,
        succeeded: 0,
        failed: 0,
        retimed: 0,
        skipped_folders: Vec::new(),
    };

    for folder in &options.folders {
        let dir = options.base_dir.join(folder);
        if !dir.is_dir() {
            log::debug!("Skipping missing folder {:?}", dir);
            report.skipped_folders.push(folder.clone());
            continue;
        }

        let videos = match files_with_extension(&dir, "mp4", false) {
            Ok(videos) => videos,
            Err(e) => {
                log::error!("Cannot list {:?}: {:#}", dir, e);
                report.skipped_folders.push(folder.clone());
                continue;
            }
        };

        log::info!("Processing {} ({} videos)", folder, videos.len());
        for video in videos {
            let output = suffixed_output_path(&video, &options.suffix);
            match adjust_duration(backend, &video, target, &output, options.tolerance) {
                Ok(plan) => {
                    log::info!("  adjusted {}", file_label(&output));
                    report.succeeded += 1;
                    if matches!(plan, SpeedPlan::Retime { .. }) {
                        report.retimed += 1;
                    }
                }
                Err(e) => {
                    log::error!("  failed {}: {:#}", file_label(&video), e);
                    report.failed += 1;
                }
            }
        }
    }

    log::info!(
        "Normalization finished: {} adjusted ({} re-timed) / {} failed",
        report.succeeded,
        report.retimed,
        report.failed
    );

    Ok(Some(report))
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        options: NormalizeOptions,
    }

    #[test]
    fn cli_defaults_match_default_options() {
        let parsed = TestCli::parse_from(["test"]).options;
        let defaults = NormalizeOptions::default();
        assert_eq!(parsed.base_dir, defaults.base_dir);
        assert_eq!(parsed.reference, defaults.reference);
        assert_eq!(parsed.folders, defaults.folders);
        assert_eq!(parsed.tolerance, defaults.tolerance);
        assert_eq!(parsed.suffix, defaults.suffix);
    }

    #[test]
    fn folder_flags_replace_default_list() {
        let parsed = TestCli::parse_from(["test", "-f", "a", "--folder", "b/c", "-r", "ref/*.mp4"]).options;
        assert_eq!(parsed.folders, vec!["a", "b/c"]);
        assert_eq!(parsed.reference, FilePattern::new("ref", "mp4"));
    }
}
