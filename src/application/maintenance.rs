//! Housekeeping: stale temp files and missing thumbnails.

use crate::application::reconciler::StateReconciler;
use crate::application::thumbnail::capture_frame;
use crate::domain::layout::first_segment_key;
use crate::domain::thumbnail::ThumbnailSettings;
use crate::error::RepositoryError;
use crate::ports::media::MediaToolkit;
use crate::ports::repository::VideoRepository;
use crate::ports::storage::ObjectStorage;
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{info, warn};

/// Seek position inside the first segment when regenerating thumbnails.
pub const REGENERATE_AT_SECS: f64 = 3.0;

/// Delete plain files directly under `work_root` last modified more than
/// `max_age` ago. Directories belong to running jobs and are skipped.
pub async fn sweep_stale_files(work_root: &Path, max_age: Duration) -> Result<usize, io::Error> {
    let mut entries = match tokio::fs::read_dir(work_root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let now = SystemTime::now();
    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let meta = entry.metadata().await?;
        if !meta.is_file() {
            continue;
        }
        let age = meta
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age <= max_age {
            continue;
        }
        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => removed += 1,
            Err(e) => warn!(path = %entry.path().display(), error = %e, "Failed to remove stale file"),
        }
    }

    if removed > 0 {
        info!(removed, root = %work_root.display(), "Swept stale temp files");
    }
    Ok(removed)
}

/// For every ready video without a thumbnail, grab a frame from the first
/// segment of its lowest-bitrate quality. Reads go through `repo`, the write
/// through `reconciler`. Returns how many were set.
pub async fn regenerate_thumbnails<M, S, R>(
    toolkit: &M,
    storage: &S,
    repo: &R,
    reconciler: &StateReconciler<R>,
    work_root: &Path,
    settings: &ThumbnailSettings,
) -> Result<usize, RepositoryError>
where
    M: MediaToolkit + ?Sized,
    S: ObjectStorage + ?Sized,
    R: VideoRepository + ?Sized,
{
    let videos = repo.ready_without_thumbnail().await?;
    let mut regenerated = 0;

    for video in videos {
        let files = repo.video_files(video.id).await?;
        let Some(lowest) = files.iter().min_by_key(|f| f.bitrate) else {
            warn!(video_id = video.id, "Ready video has no published qualities");
            continue;
        };

        if let Err(e) = tokio::fs::create_dir_all(work_root).await {
            warn!(root = %work_root.display(), error = %e, "Cannot prepare work root");
            break;
        }
        let segment = match tempfile::Builder::new()
            .prefix(&format!("regen_{}_", video.id))
            .suffix(".ts")
            .tempfile_in(work_root)
        {
            Ok(file) => file.into_temp_path(),
            Err(e) => {
                warn!(video_id = video.id, error = %e, "Cannot create scratch file");
                continue;
            }
        };

        let key = first_segment_key(video.id, &lowest.quality);
        if let Err(e) = storage.download(&key, &segment).await {
            warn!(video_id = video.id, key = %key, error = %e, "Failed to fetch first segment");
            continue;
        }

        match capture_frame(toolkit, storage, &segment, REGENERATE_AT_SECS, video.id, settings).await {
            Ok(thumbnail) => {
                reconciler.record_thumbnail(video.id, &thumbnail).await?;
                info!(video_id = video.id, key = %thumbnail, "Thumbnail regenerated");
                regenerated += 1;
            }
            Err(e) => warn!(video_id = video.id, error = %e, "Thumbnail regeneration failed"),
        }
    }

    Ok(regenerated)
}
