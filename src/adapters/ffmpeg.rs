//! ffprobe / ffmpeg CLI implementation of `MediaToolkit`.

use crate::domain::layout::{SEGMENT_PATTERN, VARIANT_PLAYLIST};
use crate::domain::quality::{QualityProfile, Resolution};
use crate::error::ToolError;
use crate::ports::media::MediaToolkit;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::debug;

/// Keep error messages readable; ffmpeg prints its whole banner on stderr.
const STDERR_TAIL_BYTES: usize = 2048;

#[derive(Debug, Clone)]
pub struct FfmpegToolkit {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Default for FfmpegToolkit {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl FfmpegToolkit {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    async fn run(&self, tool: &'static str, command: &mut Command) -> Result<Output, ToolError> {
        debug!(tool, command = ?command.as_std(), "Running media tool");
        let output = command
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ToolError::Spawn { tool, source })?;

        if !output.status.success() {
            return Err(ToolError::Failed {
                tool,
                status: output.status.to_string(),
                stderr: stderr_tail(&output.stderr),
            });
        }
        Ok(output)
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    let mut start = text.len().saturating_sub(STDERR_TAIL_BYTES);
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}

/// Parses ffprobe's `format=duration` output.
pub fn parse_duration(stdout: &str) -> Result<f64, ToolError> {
    let value = stdout.trim();
    let duration: f64 = value.parse().map_err(|_| ToolError::InvalidOutput {
        tool: "ffprobe",
        detail: format!("duration '{}' is not a number", value),
    })?;
    if !duration.is_finite() || duration < 0.0 {
        return Err(ToolError::InvalidOutput {
            tool: "ffprobe",
            detail: format!("duration '{}' is out of range", value),
        });
    }
    Ok(duration)
}

#[async_trait]
impl MediaToolkit for FfmpegToolkit {
    async fn probe_duration(&self, source: &Path) -> Result<f64, ToolError> {
        let output = self
            .run(
                "ffprobe",
                Command::new(&self.ffprobe)
                    .arg("-v")
                    .arg("error")
                    .arg("-show_entries")
                    .arg("format=duration")
                    .arg("-of")
                    .arg("default=noprint_wrappers=1:nokey=1")
                    .arg(source),
            )
            .await?;

        parse_duration(&String::from_utf8_lossy(&output.stdout))
    }

    async fn encode_rendition(
        &self,
        source: &Path,
        output_dir: &Path,
        profile: &QualityProfile,
        segment_seconds: u32,
    ) -> Result<PathBuf, ToolError> {
        tokio::fs::create_dir_all(output_dir).await?;
        let playlist = output_dir.join(VARIANT_PLAYLIST);

        self.run(
            "ffmpeg",
            Command::new(&self.ffmpeg)
                .arg("-y")
                .arg("-i")
                .arg(source)
                .arg("-vf")
                .arg(format!("scale={}", profile.resolution))
                .arg("-c:v")
                .arg("libx264")
                .arg("-b:v")
                .arg(format!("{}k", profile.video_bitrate_kbps))
                .arg("-c:a")
                .arg("aac")
                .arg("-b:a")
                .arg(format!("{}k", profile.audio_bitrate_kbps))
                .arg("-hls_time")
                .arg(segment_seconds.to_string())
                // 0 = keep every segment; this is VOD, not a live window
                .arg("-hls_list_size")
                .arg("0")
                .arg("-hls_segment_filename")
                .arg(output_dir.join(SEGMENT_PATTERN))
                .arg("-f")
                .arg("hls")
                .arg(&playlist),
        )
        .await?;

        if !tokio::fs::try_exists(&playlist).await? {
            return Err(ToolError::MissingOutput(playlist));
        }
        Ok(playlist)
    }

    async fn extract_frame(
        &self,
        source: &Path,
        at_seconds: f64,
        size: Resolution,
        output: &Path,
    ) -> Result<(), ToolError> {
        self.run(
            "ffmpeg",
            Command::new(&self.ffmpeg)
                .arg("-y")
                .arg("-ss")
                .arg(format!("{:.3}", at_seconds))
                .arg("-i")
                .arg(source)
                .arg("-vframes")
                .arg("1")
                .arg("-vf")
                .arg(format!("scale={}:{}", size.width, size.height))
                .arg("-q:v")
                .arg("2")
                .arg(output),
        )
        .await?;

        if !tokio::fs::try_exists(output).await? {
            return Err(ToolError::MissingOutput(output.to_path_buf()));
        }
        Ok(())
    }
}
