use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;

use crate::error::ClipError;

/// Number of trailing stderr lines kept in the error of a failed run
const STDERR_TAIL_LINES: usize = 20;

/// FFmpeg command builder with fluent interface
#[derive(Debug, Clone)]
pub struct FFmpegCommand {
    input: PathBuf,
    output: PathBuf,
    log_level: Option<String>,
    video_filters: Vec<String>,
    audio_filters: Vec<String>,
    video_codec: Option<String>,
    audio_codec: Option<String>,
    pixel_format: Option<String>,
    faststart: bool,
    overwrite: bool,
}

impl FFmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            log_level: None,
            video_filters: Vec::new(),
            audio_filters: Vec::new(),
            video_codec: None,
            audio_codec: None,
            pixel_format: None,
            faststart: false,
            overwrite: false,
        }
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Set ffmpeg's `-loglevel` (quiet, error, warning, info, ...)
    pub fn log_level(mut self, level: &str) -> Self {
        self.log_level = Some(level.to_string());
        self
    }

    /// Set video codec
    pub fn video_codec(mut self, codec: &str) -> Self {
        self.video_codec = Some(codec.to_string());
        self
    }

    /// Set audio codec
    pub fn audio_codec(mut self, codec: &str) -> Self {
        self.audio_codec = Some(codec.to_string());
        self
    }

    /// Set output pixel format
    pub fn pixel_format(mut self, format: &str) -> Self {
        self.pixel_format = Some(format.to_string());
        self
    }

    /// Move the moov atom to the front so playback can start before download completes
    pub fn faststart(mut self) -> Self {
        self.faststart = true;
        self
    }

    /// Enable overwrite without asking
    pub fn overwrite(mut self) -> Self {
        self.overwrite = true;
        self
    }

    /// Set playback speed (affects both video and audio).
    /// If has_audio is false, only video speed is adjusted.
    /// Multipliers that are not finite and positive are ignored.
    pub fn speed(mut self, multiplier: f64, has_audio: bool) -> Self {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            log::warn!("Ignoring invalid speed multiplier {}", multiplier);
            return self;
        }

        if multiplier != 1.0 {
            // f64 Display is exact (shortest round-trip) and never uses exponent notation
            self.video_filters
                .push(format!("setpts=PTS/{}", multiplier));

            if has_audio {
                self.audio_filters.extend(atempo_chain(multiplier));
            }
        }
        self
    }

    /// Scale video; a negative dimension keeps the aspect ratio
    /// (`-2` additionally rounds to an even value)
    pub fn scale(mut self, width: i32, height: i32) -> Self {
        self.video_filters
            .push(format!("scale={}:{}", width, height));
        self
    }

    /// Arguments passed to the `ffmpeg` binary, in order
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(ref level) = self.log_level {
            args.extend(["-loglevel".to_string(), level.clone()]);
        }

        args.extend(["-i".to_string(), self.input.to_string_lossy().into_owned()]);

        if self.audio_filters.is_empty() {
            // A plain -vf keeps ffmpeg's default stream selection
            if !self.video_filters.is_empty() {
                args.extend(["-vf".to_string(), self.video_filters.join(",")]);
            }
        } else {
            let mut filter_complex = String::new();
            if !self.video_filters.is_empty() {
                filter_complex.push_str(&format!("[0:v]{}[v]; ", self.video_filters.join(",")));
            }
            filter_complex.push_str(&format!("[0:a]{}[a]", self.audio_filters.join(",")));

            args.extend(["-filter_complex".to_string(), filter_complex]);

            if self.video_filters.is_empty() {
                args.extend(["-map".to_string(), "0:v?".to_string()]);
            } else {
                args.extend(["-map".to_string(), "[v]".to_string()]);
            }
            args.extend(["-map".to_string(), "[a]".to_string()]);
        }

        if self.faststart {
            args.extend(["-movflags".to_string(), "+faststart".to_string()]);
        }

        if let Some(ref format) = self.pixel_format {
            args.extend(["-pix_fmt".to_string(), format.clone()]);
        }

        if let Some(ref codec) = self.video_codec {
            args.extend(["-c:v".to_string(), codec.clone()]);
        }

        if let Some(ref codec) = self.audio_codec {
            args.extend(["-c:a".to_string(), codec.clone()]);
        }

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push(self.output.to_string_lossy().into_owned());
        args
    }

    /// Build the FFmpeg command
    pub fn build(&self) -> Command {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(self.args());
        cmd
    }

    /// Execute the FFmpeg command with progress tracking
    pub fn execute<F>(&self, progress_callback: F) -> Result<()>
    where
        F: Fn(f64) + Send + 'static,
    {
        let mut cmd = self.build();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        log::debug!("Executing FFmpeg command: {:?}", cmd);

        let mut child = cmd.spawn().context("Failed to spawn FFmpeg process")?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow::anyhow!("Failed to capture stderr"))?;

        let (tx, rx) = mpsc::channel();

        // Read stderr on a separate thread so the pipe never fills up
        let reader_thread = thread::spawn(move || {
            let reader = BufReader::new(stderr);
            let duration_regex = Regex::new(r"Duration: (\d{2}):(\d{2}):(\d{2})\.(\d{2})").unwrap();
            let progress_regex = Regex::new(r"time=(\d{2}):(\d{2}):(\d{2})\.(\d{2})").unwrap();

            let mut total_duration: Option<f64> = None;
            let mut all_output = Vec::new();

            // ffmpeg ends progress updates with \r, everything else with \n
            for chunk in reader.split(b'\r').map_while(Result::ok) {
                for line in String::from_utf8_lossy(&chunk).lines() {
                    if total_duration.is_none()
                        && let Some(caps) = duration_regex.captures(line)
                    {
                        total_duration = Some(timestamp_seconds(&caps));
                    }

                    if let Some(caps) = progress_regex.captures(line)
                        && let Some(duration) = total_duration
                        && duration > 0.0
                    {
                        let progress = (timestamp_seconds(&caps) / duration * 100.0).min(100.0);
                        let _ = tx.send(progress);
                        continue;
                    }

                    all_output.push(line.to_string());
                }
            }
            all_output
        });

        let progress_thread = thread::spawn(move || {
            while let Ok(progress) = rx.recv() {
                progress_callback(progress);
            }
        });

        let status = child.wait().context("Failed to wait for FFmpeg process")?;

        let all_output = reader_thread.join().unwrap_or_default();
        let _ = progress_thread.join();

        if !status.success() {
            log::debug!("FFmpeg failed with output:\n{}", all_output.join("\n"));
            let tail_start = all_output.len().saturating_sub(STDERR_TAIL_LINES);
            let tail = all_output[tail_start..].join("\n");
            anyhow::bail!(
                "FFmpeg failed with exit code {:?}: {}",
                status.code(),
                if tail.is_empty() { "no output" } else { tail.trim() }
            );
        }

        Ok(())
    }
}

/// Split a speed multiplier into `atempo` stages that each stay inside
/// ffmpeg's supported 0.5..=2.0 range; their product equals `multiplier`.
/// Returns no stages for multipliers that are not finite and positive.
pub(crate) fn atempo_chain(multiplier: f64) -> Vec<String> {
    let mut filters = Vec::new();
    if !multiplier.is_finite() || multiplier <= 0.0 {
        return filters;
    }
    let mut current = multiplier;

    while current > 2.0 {
        filters.push("atempo=2.0".to_string());
        current /= 2.0;
    }
    while current < 0.5 {
        filters.push("atempo=0.5".to_string());
        current *= 2.0;
    }
    if current != 1.0 {
        filters.push(format!("atempo={}", current));
    }

    filters
}

fn timestamp_seconds(caps: &regex::Captures<'_>) -> f64 {
    let hours: f64 = caps[1].parse().unwrap_or(0.0);
    let minutes: f64 = caps[2].parse().unwrap_or(0.0);
    let seconds: f64 = caps[3].parse().unwrap_or(0.0);
    let centis: f64 = caps[4].parse().unwrap_or(0.0);
    hours * 3600.0 + minutes * 60.0 + seconds + centis / 100.0
}

/// Check if FFmpeg is available and return version info
pub fn check_ffmpeg() -> Result<String> {
    let output = Command::new("ffmpeg")
        .arg("-version")
        .output()
        .context("FFmpeg not found. Please install FFmpeg.")?;

    let version = String::from_utf8_lossy(&output.stdout);
    Ok(parse_ffmpeg_version(&version).unwrap_or_else(|| "unknown".to_string()))
}

fn parse_ffmpeg_version(banner: &str) -> Option<String> {
    let version_regex = Regex::new(r"ffmpeg version (\S+)").unwrap();
    version_regex
        .captures(banner)
        .map(|caps| caps[1].to_string())
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Get video metadata using ffprobe
pub fn get_video_info(path: impl AsRef<Path>) -> Result<VideoInfo> {
    let path = path.as_ref();
    let output = Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(path)
        .output()
        .context("Failed to run ffprobe")?;

    if !output.status.success() {
        return Err(ClipError::Probe {
            path: path.to_path_buf(),
            message: format!("exit code {:?}", output.status.code()),
        }
        .into());
    }

    parse_probe_json(path, &String::from_utf8_lossy(&output.stdout))
}

pub(crate) fn parse_probe_json(path: &Path, json: &str) -> Result<VideoInfo> {
    let probe: ProbeOutput = serde_json::from_str(json).map_err(|e| ClipError::Probe {
        path: path.to_path_buf(),
        message: format!("unreadable ffprobe output: {e}"),
    })?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));

    // ffprobe reports "N/A" for some containers, so each candidate is parsed
    // before moving on to the next one
    let parse_duration = |d: Option<&str>| d.and_then(|d| d.parse::<f64>().ok());
    let duration = parse_duration(probe.format.as_ref().and_then(|f| f.duration.as_deref()))
        .or_else(|| parse_duration(video.and_then(|v| v.duration.as_deref())))
        .ok_or_else(|| ClipError::MissingDuration(path.to_path_buf()))?;

    let fps = video
        .and_then(|v| v.r_frame_rate.as_deref())
        .and_then(|rate| {
            let (num, den) = rate.split_once('/')?;
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            (den != 0.0).then(|| num / den)
        })
        .unwrap_or(0.0);

    Ok(VideoInfo {
        duration,
        width: video.and_then(|v| v.width).unwrap_or(0),
        height: video.and_then(|v| v.height).unwrap_or(0),
        fps,
        has_audio: probe
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some("audio")),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub has_audio: bool,
}
