//! Pipeline stages, progress milestones and job outcomes.

use super::video::VideoId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// `Start -> Probe -> Encode -> Assemble -> Thumbnail -> Publish -> Reconcile -> Done`,
/// with an edge from every stage to a forced failure and then `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    Probe,
    Encode,
    Assemble,
    Thumbnail,
    Publish,
    Reconcile,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::Probe => "probe",
            Stage::Encode => "encode",
            Stage::Assemble => "assemble",
            Stage::Thumbnail => "thumbnail",
            Stage::Publish => "publish",
            Stage::Reconcile => "reconcile",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Advisory progress snapshot. Never used for correctness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub stage: Stage,
    pub quality: Option<String>,
    pub percent: u8,
    pub failed: bool,
    pub updated_at: DateTime<Utc>,
}

impl Progress {
    pub fn at(stage: Stage, percent: u8) -> Self {
        Self {
            stage,
            quality: None,
            percent: percent.min(100),
            failed: false,
            updated_at: Utc::now(),
        }
    }

    /// Encoding milestone for the `index`-th of `total` qualities (10% to 70%).
    pub fn encoding(quality: &str, index: usize, total: usize) -> Self {
        let span = 60 * index / total.max(1);
        Self {
            quality: Some(quality.to_string()),
            ..Self::at(Stage::Encode, 10 + span as u8)
        }
    }

    pub fn failed() -> Self {
        Self {
            failed: true,
            ..Self::at(Stage::Done, 100)
        }
    }
}

/// Why a job ended in `failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FatalCause {
    VideoNotFound,
    /// The uploaded file is gone, e.g. removed by an earlier attempt.
    InputMissing,
    NoRenditions,
    PublishFailed,
    Workspace(String),
    Assembly(String),
    Repository(String),
}

impl fmt::Display for FatalCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalCause::VideoNotFound => write!(f, "video record not found"),
            FatalCause::InputMissing => write!(f, "input file is missing"),
            FatalCause::NoRenditions => write!(f, "no quality could be encoded"),
            FatalCause::PublishFailed => write!(f, "no artifact was uploaded"),
            FatalCause::Workspace(e) => write!(f, "workspace error: {}", e),
            FatalCause::Assembly(e) => write!(f, "master playlist error: {}", e),
            FatalCause::Repository(e) => write!(f, "repository error: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// Every configured quality was published.
    Success { qualities: Vec<String> },
    /// Some qualities failed; the video is ready with the rest.
    Partial {
        qualities: Vec<String>,
        failed: Vec<String>,
    },
    /// The video was forced to `failed`.
    Fatal { stage: Stage, cause: FatalCause },
}

impl PipelineOutcome {
    pub fn is_published(&self) -> bool {
        !matches!(self, PipelineOutcome::Fatal { .. })
    }

    pub fn published_qualities(&self) -> &[String] {
        match self {
            PipelineOutcome::Success { qualities } | PipelineOutcome::Partial { qualities, .. } => {
                qualities.as_slice()
            }
            PipelineOutcome::Fatal { .. } => &[],
        }
    }
}

/// What the worker gets back for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobReport {
    pub video_id: VideoId,
    pub outcome: PipelineOutcome,
    pub duration_secs: u32,
    pub master_playlist_key: Option<String>,
    pub thumbnail_key: Option<String>,
}
