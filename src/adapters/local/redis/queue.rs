//! Redis JobQueuePort implementation.

use super::pool::RedisPool;
use super::{MAINTENANCE_QUEUE, TRANSCODE_QUEUE, VIDEO_LOCK_PREFIX};
use crate::domain::jobs::Job;
use crate::domain::video::VideoId;
use crate::error::QueueError;
use crate::ports::queue::JobQueuePort;
use async_trait::async_trait;
use deadpool_redis::redis::{self, AsyncCommands};
use std::time::Duration;

fn queue_for(job: &Job) -> &'static str {
    match job {
        Job::Transcode(_) => TRANSCODE_QUEUE,
        Job::RegenerateThumbnails(_) => MAINTENANCE_QUEUE,
    }
}

fn lock_key(video_id: VideoId) -> String {
    format!("{}{}", VIDEO_LOCK_PREFIX, video_id)
}

#[async_trait]
impl JobQueuePort for RedisPool {
    async fn enqueue_job(&self, job: &Job) -> Result<(), QueueError> {
        let mut conn = self.pool.get().await?;
        let json = serde_json::to_string(job)?;
        conn.lpush::<_, _, ()>(queue_for(job), json).await?;
        Ok(())
    }

    async fn dequeue_job(&self, timeout_secs: f64) -> Result<Option<Job>, QueueError> {
        let mut conn = self.pool.get().await?;

        // BRPOP checks keys in order, so transcode work always wins.
        let result: Option<(String, String)> = conn
            .brpop(&[TRANSCODE_QUEUE, MAINTENANCE_QUEUE], timeout_secs)
            .await?;
        match result {
            Some((_, json)) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn acquire_video_lock(&self, video_id: VideoId, ttl: Duration) -> Result<bool, QueueError> {
        let mut conn = self.pool.get().await?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(lock_key(video_id))
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn release_video_lock(&self, video_id: VideoId) -> Result<(), QueueError> {
        let mut conn = self.pool.get().await?;
        conn.del::<_, ()>(lock_key(video_id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::jobs::{RegenerateThumbnailsJob, TranscodeJob};
    use uuid::Uuid;

    #[test]
    fn test_jobs_route_to_their_queue() {
        let transcode = Job::Transcode(TranscodeJob::new(1, "/tmp/videos/upload_1.mp4"));
        let maintenance = Job::RegenerateThumbnails(RegenerateThumbnailsJob { id: Uuid::new_v4() });
        assert_eq!(queue_for(&transcode), TRANSCODE_QUEUE);
        assert_eq!(queue_for(&maintenance), MAINTENANCE_QUEUE);
    }

    #[test]
    fn test_lock_key() {
        assert_eq!(lock_key(42), "vodforge:lock:video:42");
    }
}
