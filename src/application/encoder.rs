//! Quality encoding: one rendition per ladder entry, failures isolated per
//! quality.

use crate::domain::hls::MediaPlaylist;
use crate::domain::pipeline::Progress;
use crate::domain::quality::QualityProfile;
use crate::domain::video::VideoId;
use crate::error::ToolError;
use crate::ports::media::MediaToolkit;
use crate::ports::progress::ProgressSink;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A quality that encoded and passed verification.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRendition {
    pub profile: QualityProfile,
    /// `<work_dir>/<quality>/playlist.m3u8`
    pub playlist: PathBuf,
    pub segment_count: usize,
    /// Sum of segment sizes
    pub size_bytes: u64,
}

#[derive(Debug, Default)]
pub struct EncodeReport {
    /// Successful renditions, in ladder order
    pub succeeded: Vec<EncodedRendition>,
    /// Names of qualities that failed, in ladder order
    pub failed: Vec<String>,
}

impl EncodeReport {
    pub fn is_empty(&self) -> bool {
        self.succeeded.is_empty()
    }
}

/// Encode `profile` into `<work_dir>/<name>/` and verify what the tool left
/// behind. On failure the quality directory is removed.
pub async fn encode_quality<M>(
    toolkit: &M,
    source: &Path,
    work_dir: &Path,
    profile: &QualityProfile,
    segment_seconds: u32,
) -> Result<EncodedRendition, ToolError>
where
    M: MediaToolkit + ?Sized,
{
    let output_dir = work_dir.join(&profile.name);
    let result = match toolkit
        .encode_rendition(source, &output_dir, profile, segment_seconds)
        .await
    {
        Ok(playlist) => verify_rendition(profile, playlist).await,
        Err(e) => Err(e),
    };

    if result.is_err() {
        if let Err(e) = tokio::fs::remove_dir_all(&output_dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(quality = %profile.name, error = %e, "Failed to remove partial rendition");
            }
        }
    }
    result
}

async fn verify_rendition(
    profile: &QualityProfile,
    playlist_path: PathBuf,
) -> Result<EncodedRendition, ToolError> {
    let text = match tokio::fs::read_to_string(&playlist_path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ToolError::MissingOutput(playlist_path))
        }
        Err(e) => return Err(e.into()),
    };
    let playlist = MediaPlaylist::parse(&text).map_err(|detail| ToolError::InvalidOutput {
        tool: "ffmpeg",
        detail,
    })?;
    if playlist.segments.is_empty() {
        return Err(ToolError::InvalidOutput {
            tool: "ffmpeg",
            detail: format!("{} playlist has no segments", profile.name),
        });
    }

    let dir = playlist_path.parent().unwrap_or_else(|| Path::new("."));
    let mut size_bytes = 0;
    for segment in &playlist.segments {
        let path = dir.join(&segment.uri);
        match tokio::fs::metadata(&path).await {
            Ok(meta) => size_bytes += meta.len(),
            Err(_) => return Err(ToolError::MissingOutput(path)),
        }
    }

    Ok(EncodedRendition {
        profile: profile.clone(),
        playlist: playlist_path,
        segment_count: playlist.segments.len(),
        size_bytes,
    })
}

/// Encode every quality of `ladder`, at most `parallelism` at a time. Results
/// keep ladder order whatever the completion order.
#[allow(clippy::too_many_arguments)]
pub async fn encode_ladder<M, P>(
    toolkit: &M,
    progress: &P,
    video_id: VideoId,
    source: &Path,
    work_dir: &Path,
    ladder: &[QualityProfile],
    segment_seconds: u32,
    parallelism: usize,
) -> EncodeReport
where
    M: MediaToolkit + ?Sized,
    P: ProgressSink + ?Sized,
{
    let total = ladder.len();
    let tasks: Vec<_> = ladder
        .iter()
        .enumerate()
        .map(|(index, profile)| async move {
            progress
                .report(video_id, Progress::encoding(&profile.name, index, total))
                .await;
            let result = encode_quality(toolkit, source, work_dir, profile, segment_seconds).await;
            (profile, result)
        })
        .collect();
    let results: Vec<_> = stream::iter(tasks)
        .buffered(parallelism.max(1))
        .collect()
        .await;

    let mut report = EncodeReport::default();
    for (profile, result) in results {
        match result {
            Ok(rendition) => {
                info!(
                    video_id,
                    quality = %profile.name,
                    segments = rendition.segment_count,
                    bytes = rendition.size_bytes,
                    "Encoded quality"
                );
                report.succeeded.push(rendition);
            }
            Err(e) => {
                warn!(video_id, quality = %profile.name, error = %e, "Quality failed to encode");
                report.failed.push(profile.name.clone());
            }
        }
    }
    report
}
