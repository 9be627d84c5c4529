//! In-process adapters for tests and single-binary runs.

use crate::domain::jobs::Job;
use crate::domain::pipeline::Progress;
use crate::domain::video::{Counter, Publication, Video, VideoFile, VideoId, VideoStatus};
use crate::error::{QueueError, RepositoryError};
use crate::ports::progress::ProgressSink;
use crate::ports::queue::JobQueuePort;
use crate::ports::repository::VideoRepository;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Notify, RwLock};

#[derive(Default)]
struct Tables {
    videos: BTreeMap<VideoId, Video>,
    files: BTreeMap<VideoId, Vec<VideoFile>>,
}

/// `VideoRepository` held in memory. `set_unavailable` simulates a lost
/// database connection; `set_writes_unavailable` limits that to the status
/// transitions and `set_publish_rejected` makes `publish` fail in the backend.
#[derive(Default)]
pub struct InMemoryVideoRepository {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
    writes_unavailable: AtomicBool,
    publish_rejected: AtomicBool,
}

impl InMemoryVideoRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a row, as the upload side would.
    pub async fn insert_video(&self, video: Video) {
        self.tables.write().await.videos.insert(video.id, video);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn set_writes_unavailable(&self, unavailable: bool) {
        self.writes_unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn set_publish_rejected(&self, rejected: bool) {
        self.publish_rejected.store(rejected, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }

    fn check_transition(&self) -> Result<(), RepositoryError> {
        self.check()?;
        if self.writes_unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("connection reset".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl VideoRepository for InMemoryVideoRepository {
    async fn get_video(&self, id: VideoId) -> Result<Option<Video>, RepositoryError> {
        self.check()?;
        Ok(self.tables.read().await.videos.get(&id).cloned())
    }

    async fn record_duration(&self, id: VideoId, duration_secs: u32) -> Result<(), RepositoryError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let video = tables.videos.get_mut(&id).ok_or(RepositoryError::NotFound(id))?;
        video.duration = duration_secs;
        Ok(())
    }

    async fn publish(&self, id: VideoId, publication: &Publication) -> Result<(), RepositoryError> {
        self.check_transition()?;
        if self.publish_rejected.load(Ordering::SeqCst) {
            return Err(RepositoryError::Backend("duplicate key value".to_string()));
        }
        let mut tables = self.tables.write().await;
        let video = tables.videos.get_mut(&id).ok_or(RepositoryError::NotFound(id))?;
        video.status = VideoStatus::Ready;
        video.hls_master_url = Some(publication.hls_master_url.clone());
        if publication.thumbnail.is_some() {
            video.thumbnail = publication.thumbnail.clone();
        }
        video.published_at = Some(publication.published_at);

        let mut seen = HashSet::new();
        let files = publication
            .files
            .iter()
            .filter(|f| seen.insert(f.quality.clone()))
            .cloned()
            .collect();
        tables.files.insert(id, files);
        Ok(())
    }

    async fn mark_failed(&self, id: VideoId) -> Result<(), RepositoryError> {
        self.check_transition()?;
        let mut tables = self.tables.write().await;
        let video = tables.videos.get_mut(&id).ok_or(RepositoryError::NotFound(id))?;
        video.status = VideoStatus::Failed;
        Ok(())
    }

    async fn video_files(&self, id: VideoId) -> Result<Vec<VideoFile>, RepositoryError> {
        self.check()?;
        let mut files = self
            .tables
            .read()
            .await
            .files
            .get(&id)
            .cloned()
            .unwrap_or_default();
        files.sort_by(|a, b| a.bitrate.cmp(&b.bitrate).then_with(|| a.quality.cmp(&b.quality)));
        Ok(files)
    }

    async fn ready_without_thumbnail(&self) -> Result<Vec<Video>, RepositoryError> {
        self.check()?;
        Ok(self
            .tables
            .read()
            .await
            .videos
            .values()
            .filter(|v| v.status == VideoStatus::Ready && v.thumbnail.is_none())
            .cloned()
            .collect())
    }

    async fn set_thumbnail(&self, id: VideoId, key: &str) -> Result<(), RepositoryError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let video = tables.videos.get_mut(&id).ok_or(RepositoryError::NotFound(id))?;
        video.thumbnail = Some(key.to_string());
        Ok(())
    }

    async fn increment(&self, id: VideoId, counter: Counter, by: i64) -> Result<i64, RepositoryError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let video = tables.videos.get_mut(&id).ok_or(RepositoryError::NotFound(id))?;
        let value = match counter {
            Counter::Views => &mut video.views_count,
            Counter::Likes => &mut video.likes_count,
        };
        *value += by;
        Ok(*value)
    }
}

#[derive(Default)]
struct QueueState {
    transcode: VecDeque<Job>,
    maintenance: VecDeque<Job>,
    locks: HashSet<VideoId>,
}

/// `JobQueuePort` over in-process queues. Transcode jobs are served before
/// maintenance jobs, matching the Redis adapter. Lock TTLs are not enforced.
#[derive(Default)]
pub struct InMemoryQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        let state = self.state.lock().await;
        state.transcode.len() + state.maintenance.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl JobQueuePort for InMemoryQueue {
    async fn enqueue_job(&self, job: &Job) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        match job {
            Job::Transcode(_) => state.transcode.push_back(job.clone()),
            Job::RegenerateThumbnails(_) => state.maintenance.push_back(job.clone()),
        }
        drop(state);
        self.notify.notify_one();
        Ok(())
    }

    async fn dequeue_job(&self, timeout_secs: f64) -> Result<Option<Job>, QueueError> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs_f64(timeout_secs.max(0.0));
        loop {
            {
                let mut state = self.state.lock().await;
                if let Some(job) = state.transcode.pop_front() {
                    return Ok(Some(job));
                }
                if let Some(job) = state.maintenance.pop_front() {
                    return Ok(Some(job));
                }
            }
            if tokio::time::timeout_at(deadline, self.notify.notified())
                .await
                .is_err()
            {
                return Ok(None);
            }
        }
    }

    async fn acquire_video_lock(&self, video_id: VideoId, _ttl: Duration) -> Result<bool, QueueError> {
        Ok(self.state.lock().await.locks.insert(video_id))
    }

    async fn release_video_lock(&self, video_id: VideoId) -> Result<(), QueueError> {
        self.state.lock().await.locks.remove(&video_id);
        Ok(())
    }
}

/// `ProgressSink` that keeps every report, newest last.
#[derive(Default)]
pub struct InMemoryProgress {
    history: RwLock<HashMap<VideoId, Vec<Progress>>>,
}

impl InMemoryProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn history(&self, video_id: VideoId) -> Vec<Progress> {
        self.history
            .read()
            .await
            .get(&video_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ProgressSink for InMemoryProgress {
    async fn report(&self, video_id: VideoId, progress: Progress) {
        self.history
            .write()
            .await
            .entry(video_id)
            .or_default()
            .push(progress);
    }

    async fn latest(&self, video_id: VideoId) -> Option<Progress> {
        self.history
            .read()
            .await
            .get(&video_id)
            .and_then(|h| h.last().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::jobs::{RegenerateThumbnailsJob, TranscodeJob};
    use crate::domain::pipeline::Stage;
    use chrono::Utc;
    use uuid::Uuid;

    fn publication(qualities: &[&str]) -> Publication {
        Publication {
            hls_master_url: "videos/1/master.m3u8".into(),
            thumbnail: None,
            published_at: Utc::now(),
            files: qualities
                .iter()
                .map(|q| VideoFile {
                    video_id: 1,
                    quality: q.to_string(),
                    playlist_url: format!("videos/1/{}/playlist.m3u8", q),
                    bitrate: 800,
                    file_size: 10,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_publish_replaces_files() {
        let repo = InMemoryVideoRepository::new();
        repo.insert_video(Video::processing(1, "clip")).await;

        repo.publish(1, &publication(&["360p", "720p"])).await.unwrap();
        repo.publish(1, &publication(&["360p"])).await.unwrap();

        let files = repo.video_files(1).await.unwrap();
        assert_eq!(files.len(), 1);
        let video = repo.get_video(1).await.unwrap().unwrap();
        assert_eq!(video.status, VideoStatus::Ready);
        assert!(video.published_at.is_some());
    }

    #[tokio::test]
    async fn test_missing_video() {
        let repo = InMemoryVideoRepository::new();
        assert!(matches!(
            repo.mark_failed(4).await,
            Err(RepositoryError::NotFound(4))
        ));
        assert!(repo.get_video(4).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unavailable() {
        let repo = InMemoryVideoRepository::new();
        repo.insert_video(Video::processing(1, "clip")).await;
        repo.set_unavailable(true);
        assert!(repo.mark_failed(1).await.unwrap_err().is_unavailable());
    }

    #[tokio::test]
    async fn test_writes_unavailable_only_affects_transitions() {
        let repo = InMemoryVideoRepository::new();
        repo.insert_video(Video::processing(1, "clip")).await;
        repo.set_writes_unavailable(true);

        repo.record_duration(1, 30).await.unwrap();
        assert!(repo.get_video(1).await.unwrap().is_some());
        assert!(repo.mark_failed(1).await.unwrap_err().is_unavailable());
        assert!(repo.publish(1, &publication(&["360p"])).await.unwrap_err().is_unavailable());
    }

    #[tokio::test]
    async fn test_increment_counters() {
        let repo = InMemoryVideoRepository::new();
        repo.insert_video(Video::processing(1, "clip")).await;
        assert_eq!(repo.increment(1, Counter::Views, 1).await.unwrap(), 1);
        assert_eq!(repo.increment(1, Counter::Views, 2).await.unwrap(), 3);
        assert_eq!(repo.increment(1, Counter::Likes, 1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_queue_prefers_transcode_jobs() {
        let queue = InMemoryQueue::new();
        let maintenance = Job::RegenerateThumbnails(RegenerateThumbnailsJob { id: Uuid::new_v4() });
        let transcode = Job::Transcode(TranscodeJob::new(3, "/tmp/videos/upload_3.mp4"));
        queue.enqueue_job(&maintenance).await.unwrap();
        queue.enqueue_job(&transcode).await.unwrap();

        assert_eq!(queue.dequeue_job(0.1).await.unwrap(), Some(transcode));
        assert_eq!(queue.dequeue_job(0.1).await.unwrap(), Some(maintenance));
        assert_eq!(queue.dequeue_job(0.05).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_video_lock_is_exclusive() {
        let queue = InMemoryQueue::new();
        let ttl = Duration::from_secs(60);
        assert!(queue.acquire_video_lock(7, ttl).await.unwrap());
        assert!(!queue.acquire_video_lock(7, ttl).await.unwrap());
        queue.release_video_lock(7).await.unwrap();
        assert!(queue.acquire_video_lock(7, ttl).await.unwrap());
    }

    #[tokio::test]
    async fn test_progress_latest() {
        let progress = InMemoryProgress::new();
        assert!(progress.latest(1).await.is_none());
        progress.report(1, Progress::at(Stage::Probe, 5)).await;
        progress.report(1, Progress::at(Stage::Publish, 85)).await;
        assert_eq!(progress.latest(1).await.unwrap().percent, 85);
        assert_eq!(progress.history(1).await.len(), 2);
    }
}
