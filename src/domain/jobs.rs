use super::video::VideoId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Transcode one uploaded file into a published asset for `video_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscodeJob {
    pub id: Uuid,
    pub video_id: VideoId,
    /// Local file written by the upload side; removed when the job completes
    pub source_path: PathBuf,
    /// 1 for the first delivery, bumped on every retry
    pub attempt: u32,
    pub submitted_at: DateTime<Utc>,
}

impl TranscodeJob {
    pub fn new(video_id: VideoId, source_path: impl Into<PathBuf>) -> Self {
        Self {
            id: Uuid::new_v4(),
            video_id,
            source_path: source_path.into(),
            attempt: 1,
            submitted_at: Utc::now(),
        }
    }

    pub fn retry(&self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self.clone()
        }
    }
}

/// Backfill thumbnails for published videos that have none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegenerateThumbnailsJob {
    pub id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Job {
    Transcode(TranscodeJob),
    RegenerateThumbnails(RegenerateThumbnailsJob),
}

impl Job {
    pub fn id(&self) -> Uuid {
        match self {
            Job::Transcode(job) => job.id,
            Job::RegenerateThumbnails(job) => job.id,
        }
    }
}

/// Returned to the submitter. Callers poll the video status, not the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub job_id: Uuid,
    pub video_id: Option<VideoId>,
}
