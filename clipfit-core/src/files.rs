//! File discovery and output-path derivation.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use walkdir::{DirEntry, WalkDir};

use crate::error::ClipError;

/// A `<dir>/*.<ext>` pattern: regular files directly inside `dir` with the
/// given extension. That is the only wildcard shape the pipelines need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePattern {
    pub dir: PathBuf,
    pub extension: String,
}

impl FilePattern {
    pub fn new(dir: impl AsRef<Path>, extension: &str) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    /// Same pattern with its directory resolved against `base`
    pub fn relative_to(&self, base: &Path) -> Self {
        Self {
            dir: base.join(&self.dir),
            extension: self.extension.clone(),
        }
    }

    /// Matching files in file-name order. A missing directory matches nothing.
    pub fn matches(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        files_with_extension(&self.dir, &self.extension, false)
    }
}

impl FromStr for FilePattern {
    type Err = ClipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ClipError::InvalidPattern(s.to_string());
        let path = Path::new(s);

        let file_part = path.file_name().and_then(|n| n.to_str()).ok_or_else(invalid)?;
        let extension = file_part.strip_prefix("*.").ok_or_else(invalid)?;
        if extension.is_empty() || extension.contains(['*', '?', '[', '/']) {
            return Err(invalid());
        }

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if dir.to_string_lossy().contains(['*', '?', '[']) {
            return Err(invalid());
        }

        Ok(Self::new(dir, extension))
    }
}

impl fmt::Display for FilePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dir.join(format!("*.{}", self.extension)).display())
    }
}

/// Regular files under `dir` whose extension matches `extension`
/// (ASCII case-insensitive), sorted by path.
///
/// Symlinks are followed. Dot-prefixed entries are skipped like a shell glob
/// would, which also keeps leftover staging files out of the results.
pub fn files_with_extension(dir: &Path, extension: &str, recursive: bool) -> Result<Vec<PathBuf>> {
    let walker = WalkDir::new(dir).follow_links(true);
    let walker = if recursive { walker } else { walker.max_depth(1) };

    let mut files = Vec::new();
    let entries = walker
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(e).with_context(|| format!("Failed to read directory {:?}", dir));
            }
            Err(e) => {
                log::warn!("Skipping unreadable entry under {:?}: {}", dir, e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let matches = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if matches {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

/// `foo/bar.gif` -> `foo/bar.mp4`
pub fn mp4_output_path(input: &Path) -> PathBuf {
    input.with_extension("mp4")
}

/// `foo/bar.mp4` -> `foo/bar<suffix>.mp4`
pub fn suffixed_output_path(input: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = input.file_stem().unwrap_or_default().to_os_string();
    name.push(suffix);
    if let Some(ext) = input.extension() {
        name.push(".");
        name.push(ext);
    }
    input.with_file_name(name)
}
