//! Worker binary: pulls transcode jobs from Redis and runs the pipeline.
//!
//! Wires up:
//! - ffmpeg / ffprobe from PATH
//! - S3-compatible object storage
//! - PostgreSQL video repository
//! - Redis queue, video locks and progress

use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use vodforge::adapters::aws::S3Storage;
use vodforge::adapters::local::RedisPool;
use vodforge::adapters::postgres::PgVideoRepository;
use vodforge::adapters::FfmpegToolkit;
use vodforge::application::maintenance::sweep_stale_files;
use vodforge::ports::storage::ObjectStorage;
use vodforge::{telemetry, TranscodePipeline, WorkerConfig, WorkerService, WorkerSettings};

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    telemetry::init_tracing();

    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    // 1. Adapters
    let redis = match RedisPool::new(&config.redis_url) {
        Ok(pool) => Arc::new(pool),
        Err(e) => {
            error!(error = %e, "Failed to create Redis pool");
            return ExitCode::FAILURE;
        }
    };

    let max_connections = u32::try_from(config.worker_count + 1).unwrap_or(u32::MAX);
    let repo = match PgVideoRepository::connect(&config.database_url, max_connections).await {
        Ok(repo) => Arc::new(repo),
        Err(e) => {
            error!(error = %e, "Failed to connect to PostgreSQL");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = repo.ensure_schema().await {
        error!(error = %e, "Failed to apply schema");
        return ExitCode::FAILURE;
    }

    let storage = Arc::new(S3Storage::from_config(&config.storage).await);
    if let Err(e) = storage.ensure_container().await {
        error!(bucket = storage.bucket(), error = %e, "Object storage unavailable");
        return ExitCode::FAILURE;
    }

    // 2. Application services
    let pipeline_config = Arc::new(config.pipeline.clone());
    let pipeline = Arc::new(TranscodePipeline::new(
        Arc::new(FfmpegToolkit::default()),
        storage,
        repo,
        redis.clone(),
        pipeline_config.clone(),
    ));
    let settings = WorkerSettings {
        max_attempts: config.max_attempts,
        lock_ttl: config.lock_ttl,
        ..WorkerSettings::default()
    };
    let worker_service = Arc::new(WorkerService::new(pipeline, redis, settings));

    // 3. Start workers
    for i in 0..config.worker_count {
        let w = worker_service.clone();
        tokio::spawn(async move {
            w.run_worker_loop(i).await;
        });
    }
    info!(workers = config.worker_count, "Started transcoding workers");

    // 4. Stale temp sweep
    let work_root = pipeline_config.work_root.clone();
    let (sweep_interval, max_age) = (config.sweep_interval, config.temp_max_age);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        loop {
            ticker.tick().await;
            if let Err(e) = sweep_stale_files(&work_root, max_age).await {
                error!(root = %work_root.display(), error = %e, "Temp sweep failed");
            }
        }
    });

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down"),
        Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
    }
    ExitCode::SUCCESS
}
