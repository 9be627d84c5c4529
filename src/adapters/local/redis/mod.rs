//! Redis adapters: job queue, per-video locks and progress snapshots.

mod pool;
mod progress;
mod queue;

pub use pool::RedisPool;

/// Redis key constants
const TRANSCODE_QUEUE: &str = "vodforge:jobs:transcode";
const MAINTENANCE_QUEUE: &str = "vodforge:jobs:maintenance";
const VIDEO_LOCK_PREFIX: &str = "vodforge:lock:video:";
const PROGRESS_PREFIX: &str = "vodforge:progress:";

/// Progress snapshots outlive the job by a day.
const PROGRESS_TTL_SECS: u64 = 24 * 60 * 60;
