//! Job intake CLI: queue a transcode for an uploaded file, or a thumbnail
//! backfill.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;
use vodforge::adapters::local::RedisPool;
use vodforge::domain::video::VideoId;
use vodforge::{telemetry, JobIntake};

#[derive(Parser, Debug)]
#[command(version, about = "Submit jobs to the vodforge workers")]
struct Cli {
    /// Redis connection URL
    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1/")]
    redis_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Transcode an uploaded file for an existing video row
    Transcode {
        /// Id of the video row, already in `processing`
        video_id: VideoId,
        /// Local path of the uploaded file, readable by the workers
        path: PathBuf,
    },
    /// Regenerate thumbnails for ready videos that have none
    Thumbnails,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    telemetry::init_tracing();
    let cli = Cli::parse();

    let queue = match RedisPool::new(&cli.redis_url) {
        Ok(pool) => Arc::new(pool),
        Err(e) => {
            error!(error = %e, "Failed to create Redis pool");
            return ExitCode::FAILURE;
        }
    };
    let intake = JobIntake::new(queue);

    let handle = match cli.command {
        Command::Transcode { video_id, path } => intake.submit(video_id, path).await,
        Command::Thumbnails => intake.request_thumbnail_regeneration().await,
    };

    match handle {
        Ok(handle) => match serde_json::to_string(&handle) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(error = %e, "Failed to encode job handle");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            error!(error = %e, "Failed to submit job");
            ExitCode::FAILURE
        }
    }
}
