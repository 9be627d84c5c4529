//! Persisted video records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type VideoId = i64;

/// Lifecycle status of a video. The upload side creates rows in
/// `Processing`; the pipeline only ever moves them to `Ready` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Processing,
    Ready,
    Failed,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Processing => "processing",
            VideoStatus::Ready => "ready",
            VideoStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, VideoStatus::Processing)
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(VideoStatus::Processing),
            "ready" => Ok(VideoStatus::Ready),
            "failed" => Ok(VideoStatus::Failed),
            other => Err(format!("unknown video status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: VideoId,
    pub title: String,
    pub status: VideoStatus,
    /// Whole seconds, 0 when unknown
    pub duration: u32,
    /// Storage key of the master manifest, set on success only
    pub hls_master_url: Option<String>,
    /// Storage key of the representative frame
    pub thumbnail: Option<String>,
    pub views_count: i64,
    pub likes_count: i64,
    pub published_at: Option<DateTime<Utc>>,
}

impl Video {
    /// A freshly uploaded video, as the upload side creates it.
    pub fn processing(id: VideoId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            status: VideoStatus::Processing,
            duration: 0,
            hls_master_url: None,
            thumbnail: None,
            views_count: 0,
            likes_count: 0,
            published_at: None,
        }
    }
}

/// One published quality variant of a video. At most one per (video, quality).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoFile {
    pub video_id: VideoId,
    pub quality: String,
    pub playlist_url: String,
    /// Video bitrate in kbps
    pub bitrate: u32,
    /// Sum of the variant's segment sizes in bytes
    pub file_size: u64,
}

/// Everything the success transition writes, applied as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Publication {
    pub hls_master_url: String,
    pub thumbnail: Option<String>,
    pub published_at: DateTime<Utc>,
    pub files: Vec<VideoFile>,
}

/// Counters bumped by upstream collaborators (views, likes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Views,
    Likes,
}

impl Counter {
    pub fn column(&self) -> &'static str {
        match self {
            Counter::Views => "views_count",
            Counter::Likes => "likes_count",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_status_str() {
        assert_eq!(VideoStatus::Processing.as_str(), "processing");
        assert_eq!(VideoStatus::Ready.as_str(), "ready");
        assert_eq!("failed".parse::<VideoStatus>(), Ok(VideoStatus::Failed));
        assert!("deleted".parse::<VideoStatus>().is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!VideoStatus::Processing.is_terminal());
        assert!(VideoStatus::Ready.is_terminal());
        assert!(VideoStatus::Failed.is_terminal());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&VideoStatus::Ready).unwrap();
        assert_eq!(json, "\"ready\"");
    }
}
