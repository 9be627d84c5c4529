//! Redis ProgressSink implementation.

use super::pool::RedisPool;
use super::{PROGRESS_PREFIX, PROGRESS_TTL_SECS};
use crate::domain::pipeline::Progress;
use crate::domain::video::VideoId;
use crate::error::QueueError;
use crate::ports::progress::ProgressSink;
use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;
use tracing::warn;

impl RedisPool {
    async fn write_progress(&self, video_id: VideoId, progress: &Progress) -> Result<(), QueueError> {
        let mut conn = self.pool.get().await?;
        let json = serde_json::to_string(progress)?;
        conn.set_ex::<_, _, ()>(format!("{}{}", PROGRESS_PREFIX, video_id), json, PROGRESS_TTL_SECS)
            .await?;
        Ok(())
    }

    async fn read_progress(&self, video_id: VideoId) -> Result<Option<Progress>, QueueError> {
        let mut conn = self.pool.get().await?;
        let json: Option<String> = conn.get(format!("{}{}", PROGRESS_PREFIX, video_id)).await?;
        match json {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ProgressSink for RedisPool {
    async fn report(&self, video_id: VideoId, progress: Progress) {
        if let Err(e) = self.write_progress(video_id, &progress).await {
            warn!(video_id, error = %e, "Failed to store progress");
        }
    }

    async fn latest(&self, video_id: VideoId) -> Option<Progress> {
        match self.read_progress(video_id).await {
            Ok(progress) => progress,
            Err(e) => {
                warn!(video_id, error = %e, "Failed to read progress");
                None
            }
        }
    }
}
