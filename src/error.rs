//! Error types, one enum per port.

use crate::domain::video::VideoId;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of an external media tool (ffprobe / ffmpeg).
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to spawn {tool}: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{tool} exited with {status}: {stderr}")]
    Failed {
        tool: &'static str,
        status: String,
        stderr: String,
    },
    #[error("{tool} produced unusable output: {detail}")]
    InvalidOutput { tool: &'static str, detail: String },
    #[error("missing output {0}")]
    MissingOutput(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Why a frame could not be captured or stored.
#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("scratch directory: {0}")]
    Scratch(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("video {0} not found")]
    NotFound(VideoId),
    /// The store could not be reached at all. This is the only repository
    /// error that escapes the pipeline so the queue can retry the job.
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    #[error("repository error: {0}")]
    Backend(String),
    #[error("invalid stored data: {0}")]
    InvalidData(String),
}

impl RepositoryError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, RepositoryError::Unavailable(_))
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => RepositoryError::Unavailable(err.to_string()),
            other => RepositoryError::Backend(other.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] deadpool_redis::redis::RedisError),
    #[cfg(feature = "redis")]
    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Create pool error: {0}")]
    CreatePool(String),
    #[error("queue closed")]
    Closed,
}

#[cfg(feature = "redis")]
impl From<deadpool_redis::CreatePoolError> for QueueError {
    fn from(err: deadpool_redis::CreatePoolError) -> Self {
        QueueError::CreatePool(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} env var required")]
    Missing(&'static str),
    #[error("invalid value for {name}: {detail}")]
    Invalid { name: &'static str, detail: String },
}

/// Errors that escape the pipeline boundary. Everything else is folded into
/// the job outcome.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("could not record failure for video {video_id}: {source}")]
    Reconcile {
        video_id: VideoId,
        #[source]
        source: RepositoryError,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Queue(#[from] QueueError),
}
