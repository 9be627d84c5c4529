//! Thumbnail capture: grab one frame, upload it, forget the local copy.

use crate::domain::layout::{content_type_for, thumbnail_key};
use crate::domain::thumbnail::{pick_time, ThumbnailSettings};
use crate::domain::video::VideoId;
use crate::error::ThumbnailError;
use crate::ports::media::MediaToolkit;
use crate::ports::storage::ObjectStorage;
use std::path::Path;
use tracing::{info, warn};

/// Extract the frame at `at_seconds` and upload it to `thumbnails/<id>.<ext>`.
/// The scratch image lives in a temp dir that is removed on every path.
pub async fn capture_frame<M, S>(
    toolkit: &M,
    storage: &S,
    source: &Path,
    at_seconds: f64,
    video_id: VideoId,
    settings: &ThumbnailSettings,
) -> Result<String, ThumbnailError>
where
    M: MediaToolkit + ?Sized,
    S: ObjectStorage + ?Sized,
{
    let scratch = tempfile::Builder::new().prefix("thumb_").tempdir()?;
    let local = scratch
        .path()
        .join(format!("{}.{}", video_id, settings.extension));

    toolkit
        .extract_frame(source, at_seconds, settings.size, &local)
        .await?;

    let key = thumbnail_key(video_id, &settings.extension);
    storage
        .put_file(&key, &local, content_type_for(&local))
        .await?;
    Ok(key)
}

/// Soft-failing thumbnail step of the pipeline.
pub async fn generate_thumbnail<M, S>(
    toolkit: &M,
    storage: &S,
    source: &Path,
    video_id: VideoId,
    duration_secs: u32,
    settings: &ThumbnailSettings,
) -> Option<String>
where
    M: MediaToolkit + ?Sized,
    S: ObjectStorage + ?Sized,
{
    let at = pick_time(duration_secs);
    match capture_frame(toolkit, storage, source, at, video_id, settings).await {
        Ok(key) => {
            info!(video_id, key = %key, at, "Thumbnail uploaded");
            Some(key)
        }
        Err(e) => {
            warn!(video_id, error = %e, "Thumbnail generation failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StorageError, ToolError};
    use crate::ports::media::MockMediaToolkit;
    use crate::ports::storage::MockObjectStorage;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_uploads_under_deterministic_key() {
        let mut toolkit = MockMediaToolkit::new();
        toolkit
            .expect_extract_frame()
            .withf(|_, at, _, _| (*at - 10.0).abs() < f64::EPSILON)
            .returning(|_, _, _, out| {
                std::fs::write(out, b"jpeg").unwrap();
                Ok(())
            });
        let mut storage = MockObjectStorage::new();
        storage
            .expect_put_file()
            .withf(|key, _, content_type| key == "thumbnails/5.jpg" && content_type == "image/jpeg")
            .returning(|_, _, _| Ok(()));

        let key = generate_thumbnail(
            &toolkit,
            &storage,
            Path::new("in.mp4"),
            5,
            100,
            &ThumbnailSettings::default(),
        )
        .await;
        assert_eq!(key.as_deref(), Some("thumbnails/5.jpg"));
    }

    #[tokio::test]
    async fn test_scratch_image_removed_when_upload_fails() {
        let written = Arc::new(Mutex::new(None));
        let seen = written.clone();
        let mut toolkit = MockMediaToolkit::new();
        toolkit.expect_extract_frame().returning(move |_, _, _, out| {
            std::fs::write(out, b"jpeg").unwrap();
            *seen.lock().unwrap() = Some(out.to_path_buf());
            Ok(())
        });
        let mut storage = MockObjectStorage::new();
        storage
            .expect_put_file()
            .returning(|_, _, _| Err(StorageError::Backend("access denied".into())));

        let key = generate_thumbnail(
            &toolkit,
            &storage,
            Path::new("in.mp4"),
            5,
            0,
            &ThumbnailSettings::default(),
        )
        .await;
        assert!(key.is_none());
        let path = written.lock().unwrap().clone().unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_extraction_failure_is_soft() {
        let mut toolkit = MockMediaToolkit::new();
        toolkit
            .expect_extract_frame()
            .returning(|_, _, _, out| Err(ToolError::MissingOutput(out.to_path_buf())));
        let storage = MockObjectStorage::new();

        let key = generate_thumbnail(
            &toolkit,
            &storage,
            Path::new("in.mp4"),
            5,
            30,
            &ThumbnailSettings::default(),
        )
        .await;
        assert!(key.is_none());
    }
}
