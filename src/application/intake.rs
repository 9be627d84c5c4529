//! Job intake: what the upload side calls once a file is on disk.

use crate::domain::jobs::{Job, JobHandle, RegenerateThumbnailsJob, TranscodeJob};
use crate::domain::video::VideoId;
use crate::error::QueueError;
use crate::ports::queue::JobQueuePort;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub struct JobIntake<Q: ?Sized> {
    queue: Arc<Q>,
}

impl<Q> JobIntake<Q>
where
    Q: JobQueuePort + ?Sized,
{
    pub fn new(queue: Arc<Q>) -> Self {
        Self { queue }
    }

    /// Queue a transcode of `local_file_path` for `video_id`. The video row
    /// must already exist in `processing`.
    pub async fn submit(
        &self,
        video_id: VideoId,
        local_file_path: impl Into<PathBuf>,
    ) -> Result<JobHandle, QueueError> {
        let job = TranscodeJob::new(video_id, local_file_path);
        let handle = JobHandle {
            job_id: job.id,
            video_id: Some(video_id),
        };
        self.queue.enqueue_job(&Job::Transcode(job)).await?;
        info!(video_id, job_id = %handle.job_id, "Transcode job submitted");
        Ok(handle)
    }

    pub async fn request_thumbnail_regeneration(&self) -> Result<JobHandle, QueueError> {
        let job = RegenerateThumbnailsJob { id: Uuid::new_v4() };
        let handle = JobHandle {
            job_id: job.id,
            video_id: None,
        };
        self.queue.enqueue_job(&Job::RegenerateThumbnails(job)).await?;
        info!(job_id = %handle.job_id, "Thumbnail regeneration requested");
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::local::InMemoryQueue;

    #[tokio::test]
    async fn test_submit_enqueues_first_attempt() {
        let queue = Arc::new(InMemoryQueue::new());
        let intake = JobIntake::new(queue.clone());

        let handle = intake.submit(12, "/tmp/videos/upload_12.mp4").await.unwrap();
        assert_eq!(handle.video_id, Some(12));

        match queue.dequeue_job(0.1).await.unwrap() {
            Some(Job::Transcode(job)) => {
                assert_eq!(job.id, handle.job_id);
                assert_eq!(job.attempt, 1);
                assert_eq!(job.source_path, PathBuf::from("/tmp/videos/upload_12.mp4"));
            }
            other => panic!("unexpected job {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_regeneration_has_no_video() {
        let queue = Arc::new(InMemoryQueue::new());
        let intake = JobIntake::new(queue.clone());
        let handle = intake.request_thumbnail_regeneration().await.unwrap();
        assert!(handle.video_id.is_none());
        assert!(matches!(
            queue.dequeue_job(0.1).await.unwrap(),
            Some(Job::RegenerateThumbnails(_))
        ));
    }
}
