use crate::domain::jobs::Job;
use crate::domain::video::VideoId;
use crate::error::QueueError;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait JobQueuePort: Send + Sync {
    /// Enqueue a job
    async fn enqueue_job(&self, job: &Job) -> Result<(), QueueError>;

    /// Dequeue a job, waiting up to `timeout_secs` (0.0 waits forever).
    /// Transcode jobs are served before maintenance jobs.
    async fn dequeue_job(&self, timeout_secs: f64) -> Result<Option<Job>, QueueError>;

    /// Take the per-video lock. Returns false when another worker holds it.
    async fn acquire_video_lock(&self, video_id: VideoId, ttl: Duration)
        -> Result<bool, QueueError>;

    async fn release_video_lock(&self, video_id: VideoId) -> Result<(), QueueError>;
}
