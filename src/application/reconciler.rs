//! The only writer of video state.

use crate::application::encoder::EncodedRendition;
use crate::domain::layout::variant_playlist_key;
use crate::domain::video::{Publication, VideoFile, VideoId};
use crate::error::{PipelineError, RepositoryError};
use crate::ports::repository::VideoRepository;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct StateReconciler<R: ?Sized> {
    repo: Arc<R>,
}

impl<R> StateReconciler<R>
where
    R: VideoRepository + ?Sized,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Best effort; a lost duration is not worth failing the job over.
    pub async fn record_duration(&self, video_id: VideoId, duration_secs: u32) {
        if let Err(e) = self.repo.record_duration(video_id, duration_secs).await {
            warn!(video_id, error = %e, "Failed to record duration");
        }
    }

    /// Backfilled thumbnail for an already published video.
    pub async fn record_thumbnail(&self, video_id: VideoId, key: &str) -> Result<(), RepositoryError> {
        self.repo.set_thumbnail(video_id, key).await?;
        info!(video_id, key, "Thumbnail recorded");
        Ok(())
    }

    /// `processing -> ready`, together with one file row per rendition.
    pub async fn reconcile_success(
        &self,
        video_id: VideoId,
        master_key: &str,
        thumbnail: Option<String>,
        renditions: &[EncodedRendition],
    ) -> Result<(), RepositoryError> {
        let files = renditions
            .iter()
            .map(|r| VideoFile {
                video_id,
                quality: r.profile.name.clone(),
                playlist_url: variant_playlist_key(video_id, &r.profile.name),
                bitrate: r.profile.video_bitrate_kbps,
                file_size: r.size_bytes,
            })
            .collect();

        let publication = Publication {
            hls_master_url: master_key.to_string(),
            thumbnail,
            published_at: Utc::now(),
            files,
        };
        self.repo.publish(video_id, &publication).await?;
        info!(video_id, qualities = renditions.len(), "Video ready");
        Ok(())
    }

    /// Force `failed`. Only an unreachable store is reported back, so the
    /// queue can retry; anything else is logged and swallowed.
    pub async fn force_failed(&self, video_id: VideoId) -> Result<(), PipelineError> {
        let outcome = match self.repo.get_video(video_id).await {
            Ok(Some(_)) => self.repo.mark_failed(video_id).await,
            Ok(None) => Err(RepositoryError::NotFound(video_id)),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                info!(video_id, "Video marked failed");
                Ok(())
            }
            Err(e) if e.is_unavailable() => {
                error!(video_id, error = %e, "Could not record failure");
                Err(PipelineError::Reconcile {
                    video_id,
                    source: e,
                })
            }
            Err(e) => {
                warn!(video_id, error = %e, "Ignoring error while recording failure");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::local::InMemoryVideoRepository;
    use crate::domain::quality::default_ladder;
    use crate::domain::video::{Video, VideoStatus};
    use std::path::PathBuf;

    fn rendition(index: usize) -> EncodedRendition {
        let profile = default_ladder().remove(index);
        EncodedRendition {
            playlist: PathBuf::from(format!("/tmp/videos/processed_1/{}/playlist.m3u8", profile.name)),
            profile,
            segment_count: 2,
            size_bytes: 2048,
        }
    }

    #[tokio::test]
    async fn test_success_writes_one_row_per_rendition() {
        let repo = Arc::new(InMemoryVideoRepository::new());
        repo.insert_video(Video::processing(1, "clip")).await;
        let reconciler = StateReconciler::new(repo.clone());

        reconciler
            .reconcile_success(1, "videos/1/master.m3u8", None, &[rendition(0), rendition(2)])
            .await
            .unwrap();

        let video = repo.get_video(1).await.unwrap().unwrap();
        assert_eq!(video.status, VideoStatus::Ready);
        assert_eq!(video.hls_master_url.as_deref(), Some("videos/1/master.m3u8"));
        let files = repo.video_files(1).await.unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].playlist_url, "videos/1/360p/playlist.m3u8");
        assert_eq!(files[0].bitrate, 800);
        assert_eq!(files[1].quality, "720p");
    }

    #[tokio::test]
    async fn test_record_thumbnail() {
        let repo = Arc::new(InMemoryVideoRepository::new());
        repo.insert_video(Video::processing(1, "clip")).await;
        let reconciler = StateReconciler::new(repo.clone());

        reconciler.record_thumbnail(1, "thumbnails/1.jpg").await.unwrap();
        let video = repo.get_video(1).await.unwrap().unwrap();
        assert_eq!(video.thumbnail.as_deref(), Some("thumbnails/1.jpg"));
        assert!(matches!(
            reconciler.record_thumbnail(2, "thumbnails/2.jpg").await,
            Err(RepositoryError::NotFound(2))
        ));
    }

    #[tokio::test]
    async fn test_force_failed_swallows_missing_video() {
        let repo = Arc::new(InMemoryVideoRepository::new());
        let reconciler = StateReconciler::new(repo);
        assert!(reconciler.force_failed(9).await.is_ok());
    }

    #[tokio::test]
    async fn test_force_failed_surfaces_unavailable_store() {
        let repo = Arc::new(InMemoryVideoRepository::new());
        repo.insert_video(Video::processing(1, "clip")).await;
        repo.set_unavailable(true);
        let reconciler = StateReconciler::new(repo);

        let err = reconciler.force_failed(1).await.unwrap_err();
        assert!(matches!(err, PipelineError::Reconcile { video_id: 1, .. }));
    }
}
