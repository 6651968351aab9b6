#![allow(dead_code)]

use anyhow::{Result, anyhow};
use clipfit_core::{FFmpegCommand, MediaBackend, VideoInfo};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Backend that records every call instead of running ffmpeg.
///
/// Successful runs write a small placeholder to the command's output path;
/// failing runs write a partial file first, like an interrupted encode.
#[derive(Default)]
pub struct FakeBackend {
    durations: HashMap<PathBuf, f64>,
    silent: HashSet<PathBuf>,
    failing: HashSet<PathBuf>,
    pub probes: RefCell<Vec<PathBuf>>,
    pub runs: RefCell<Vec<FFmpegCommand>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duration(mut self, path: impl AsRef<Path>, seconds: f64) -> Self {
        self.durations.insert(path.as_ref().to_path_buf(), seconds);
        self
    }

    /// Probe reports no audio stream for `path`
    pub fn without_audio(mut self, path: impl AsRef<Path>) -> Self {
        self.silent.insert(path.as_ref().to_path_buf());
        self
    }

    /// Encoding `path` fails
    pub fn failing(mut self, path: impl AsRef<Path>) -> Self {
        self.failing.insert(path.as_ref().to_path_buf());
        self
    }

    pub fn run_count(&self) -> usize {
        self.runs.borrow().len()
    }

    pub fn run_inputs(&self) -> Vec<PathBuf> {
        self.runs.borrow().iter().map(|c| c.input().to_path_buf()).collect()
    }
}

impl MediaBackend for FakeBackend {
    fn probe(&self, path: &Path) -> Result<VideoInfo> {
        self.probes.borrow_mut().push(path.to_path_buf());
        let duration = *self
            .durations
            .get(path)
            .ok_or_else(|| anyhow!("cannot open {:?}", path))?;
        Ok(VideoInfo {
            duration,
            width: 1280,
            height: 720,
            fps: 30.0,
            has_audio: !self.silent.contains(path),
        })
    }

    fn run(&self, command: &FFmpegCommand) -> Result<()> {
        self.runs.borrow_mut().push(command.clone());
        if self.failing.contains(command.input()) {
            fs::write(command.output(), b"partial")?;
            return Err(anyhow!("FFmpeg failed with exit code Some(1): Invalid data found"));
        }
        fs::write(command.output(), b"encoded")?;
        Ok(())
    }
}

pub fn touch(path: impl AsRef<Path>) {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    File::create(path).unwrap();
}

/// Names of all entries directly inside `dir`, sorted
pub fn dir_listing(dir: impl AsRef<Path>) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
