//! Queue consumer: one job at a time per worker, per-video locking, retries.

use crate::application::orchestrator::TranscodePipeline;
use crate::domain::jobs::{Job, TranscodeJob};
use crate::domain::pipeline::JobReport;
use crate::error::QueueError;
use crate::ports::media::MediaToolkit;
use crate::ports::progress::ProgressSink;
use crate::ports::queue::JobQueuePort;
use crate::ports::repository::VideoRepository;
use crate::ports::storage::ObjectStorage;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub max_attempts: u32,
    pub lock_ttl: Duration,
    /// How long one dequeue blocks before looping
    pub poll_timeout: Duration,
    /// Pause before re-queueing a job whose video is locked elsewhere
    pub lock_backoff: Duration,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            lock_ttl: Duration::from_secs(2 * 60 * 60),
            poll_timeout: Duration::from_secs(5),
            lock_backoff: Duration::from_secs(2),
        }
    }
}

/// What happened to a dequeued job.
#[derive(Debug)]
pub enum Disposition {
    /// The pipeline ran; the report says how it ended.
    Finished(JobReport),
    /// Another worker holds the video; the job went back on the queue.
    Deferred,
    /// Infrastructure failure; re-queued as this attempt.
    Retrying { attempt: u32 },
    /// Infrastructure failure on the last allowed attempt.
    Abandoned,
    Maintenance { regenerated: usize },
}

pub struct WorkerService<M, S, R, P, Q> {
    pipeline: Arc<TranscodePipeline<M, S, R, P>>,
    queue: Arc<Q>,
    settings: WorkerSettings,
}

impl<M, S, R, P, Q> WorkerService<M, S, R, P, Q>
where
    M: MediaToolkit,
    S: ObjectStorage,
    R: VideoRepository,
    P: ProgressSink,
    Q: JobQueuePort,
{
    pub fn new(
        pipeline: Arc<TranscodePipeline<M, S, R, P>>,
        queue: Arc<Q>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            pipeline,
            queue,
            settings,
        }
    }

    pub async fn run_worker_loop(&self, worker_id: usize) {
        info!(worker_id, "Worker started");
        loop {
            match self
                .queue
                .dequeue_job(self.settings.poll_timeout.as_secs_f64())
                .await
            {
                Ok(Some(job)) => {
                    let job_id = job.id();
                    match self.process_job(&job).await {
                        Ok(disposition) => info!(worker_id, %job_id, ?disposition, "Job handled"),
                        Err(e) => error!(worker_id, %job_id, error = %e, "Job handling failed"),
                    }
                }
                Ok(None) => continue,
                Err(e) => {
                    error!(worker_id, error = %e, "Queue error");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    pub async fn process_job(&self, job: &Job) -> Result<Disposition, QueueError> {
        match job {
            Job::Transcode(transcode) => self.process_transcode(transcode).await,
            Job::RegenerateThumbnails(_) => {
                let regenerated = match self.pipeline.regenerate_missing_thumbnails().await {
                    Ok(count) => count,
                    Err(e) => {
                        warn!(error = %e, "Thumbnail regeneration aborted");
                        0
                    }
                };
                Ok(Disposition::Maintenance { regenerated })
            }
        }
    }

    async fn process_transcode(&self, job: &TranscodeJob) -> Result<Disposition, QueueError> {
        let video_id = job.video_id;
        if !self
            .queue
            .acquire_video_lock(video_id, self.settings.lock_ttl)
            .await?
        {
            warn!(video_id, "Video is being processed elsewhere, deferring");
            tokio::time::sleep(self.settings.lock_backoff).await;
            self.queue.enqueue_job(&Job::Transcode(job.clone())).await?;
            return Ok(Disposition::Deferred);
        }

        info!(video_id, attempt = job.attempt, "Transcode started");
        let result = self.pipeline.run_job(job).await;

        if let Err(e) = self.queue.release_video_lock(video_id).await {
            warn!(video_id, error = %e, "Failed to release video lock");
        }

        match result {
            Ok(report) => Ok(Disposition::Finished(report)),
            Err(e) if job.attempt < self.settings.max_attempts => {
                let retry = job.retry();
                warn!(video_id, attempt = retry.attempt, error = %e, "Infrastructure error, retrying");
                self.queue.enqueue_job(&Job::Transcode(retry.clone())).await?;
                Ok(Disposition::Retrying {
                    attempt: retry.attempt,
                })
            }
            Err(e) => {
                error!(video_id, attempts = job.attempt, error = %e, "Giving up on job");
                Ok(Disposition::Abandoned)
            }
        }
    }
}
