use crate::domain::pipeline::Progress;
use crate::domain::video::VideoId;
use async_trait::async_trait;

/// Out-of-band progress channel. Reporting is best effort: implementations
/// log their own errors instead of returning them.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, video_id: VideoId, progress: Progress);

    async fn latest(&self, video_id: VideoId) -> Option<Progress>;
}
