//! vodforge - asynchronous video-on-demand transcoding pipeline
//!
//! Hexagonal Architecture:
//! - domain/: Pure types (videos, quality ladder, HLS playlists, jobs, outcomes)
//! - ports/: Trait definitions for every external seam
//! - adapters/: Concrete implementations (ffmpeg, S3, PostgreSQL, Redis, local)
//! - application/: The pipeline components, the worker loop and job intake
//! - config: Environment configuration
//!
//! # Features
//! - `s3`: S3 / MinIO object storage
//! - `postgres`: PostgreSQL video repository
//! - `redis`: Redis job queue, video locks and progress
//!
//! All three are on by default and required by the binaries.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod telemetry;

// Re-exports for convenience
pub use application::intake::JobIntake;
pub use application::orchestrator::TranscodePipeline;
pub use application::worker::{WorkerService, WorkerSettings};
pub use config::{PipelineConfig, StorageConfig, WorkerConfig};
pub use domain::pipeline::{JobReport, PipelineOutcome};
