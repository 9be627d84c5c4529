use crate::domain::video::{Counter, Publication, Video, VideoFile, VideoId};
use crate::error::RepositoryError;
use async_trait::async_trait;

/// Narrow read/update interface over the video tables. The state reconciler
/// is the only pipeline component that writes through it.
#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn get_video(&self, id: VideoId) -> Result<Option<Video>, RepositoryError>;

    async fn record_duration(&self, id: VideoId, duration_secs: u32)
        -> Result<(), RepositoryError>;

    /// Success transition: status `ready`, manifest, thumbnail, `published_at`
    /// and the video's file rows, all in one transaction. Existing file rows
    /// for the video are replaced, never duplicated.
    async fn publish(&self, id: VideoId, publication: &Publication)
        -> Result<(), RepositoryError>;

    /// Failure transition: status `failed`, nothing else.
    async fn mark_failed(&self, id: VideoId) -> Result<(), RepositoryError>;

    async fn video_files(&self, id: VideoId) -> Result<Vec<VideoFile>, RepositoryError>;

    /// Published videos that have no thumbnail yet.
    async fn ready_without_thumbnail(&self) -> Result<Vec<Video>, RepositoryError>;

    async fn set_thumbnail(&self, id: VideoId, key: &str) -> Result<(), RepositoryError>;

    /// Atomic `counter = counter + by`, returning the new value.
    async fn increment(
        &self,
        id: VideoId,
        counter: Counter,
        by: i64,
    ) -> Result<i64, RepositoryError>;
}
