//! Configuration loaded from the environment (and `.env` when present).

use crate::domain::quality::{default_ladder, parse_ladder, QualityProfile};
use crate::domain::thumbnail::ThumbnailSettings;
use crate::error::ConfigError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Knobs for the transcoding pipeline itself. Shared read-only between jobs.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    /// Qualities to encode, in manifest order
    pub ladder: Vec<QualityProfile>,
    /// Target HLS segment length in seconds
    pub segment_seconds: u32,
    /// Parent of every per-job working directory
    pub work_root: PathBuf,
    /// How many qualities may encode at once
    pub encode_parallelism: usize,
    pub thumbnail: ThumbnailSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ladder: default_ladder(),
            segment_seconds: 10,
            work_root: PathBuf::from("/tmp/videos"),
            encode_parallelism: 1,
            thumbnail: ThumbnailSettings::default(),
        }
    }
}

/// Object storage connection. `endpoint` is set for MinIO and friends.
#[derive(Clone, Debug, PartialEq)]
pub struct StorageConfig {
    pub endpoint: Option<String>,
    pub region: String,
    pub bucket: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub force_path_style: bool,
}

/// Configuration for the worker binary.
#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub database_url: String,
    pub redis_url: String,
    pub storage: StorageConfig,
    pub pipeline: PipelineConfig,
    /// Concurrent jobs per process
    pub worker_count: usize,
    /// Deliveries per job before it is dropped
    pub max_attempts: u32,
    /// Expiry of the per-video lock; must exceed the longest job
    pub lock_ttl: Duration,
    pub sweep_interval: Duration,
    /// Files under `work_root` older than this are swept
    pub temp_max_age: Duration,
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let storage = StorageConfig::from_lookup(&lookup)?;
        let pipeline = PipelineConfig::from_lookup(&lookup)?;

        let worker_count: usize = parse_or(&lookup, "WORKER_COUNT", 1)?;
        let max_attempts: u32 = parse_or(&lookup, "JOB_MAX_ATTEMPTS", 3)?;
        if worker_count == 0 {
            return Err(invalid("WORKER_COUNT", "must be at least 1"));
        }
        if max_attempts == 0 {
            return Err(invalid("JOB_MAX_ATTEMPTS", "must be at least 1"));
        }

        Ok(Self {
            database_url: lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            redis_url: lookup("REDIS_URL").unwrap_or_else(|| String::from("redis://127.0.0.1/")),
            storage,
            pipeline,
            worker_count,
            max_attempts,
            lock_ttl: Duration::from_secs(parse_or(&lookup, "VIDEO_LOCK_TTL_SECS", 2 * 60 * 60)?),
            sweep_interval: Duration::from_secs(parse_or(&lookup, "TEMP_SWEEP_INTERVAL_SECS", 60 * 60)?),
            temp_max_age: Duration::from_secs(parse_or(&lookup, "TEMP_MAX_AGE_SECS", 24 * 60 * 60)?),
        })
    }
}

impl StorageConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let endpoint = lookup("S3_ENDPOINT").filter(|e| !e.is_empty());
        // Path-style addressing is what MinIO expects, so default to it when an
        // endpoint is given.
        let force_path_style = match lookup("S3_FORCE_PATH_STYLE") {
            Some(v) => parse_bool("S3_FORCE_PATH_STYLE", &v)?,
            None => endpoint.is_some(),
        };

        Ok(Self {
            endpoint,
            region: lookup("S3_REGION").unwrap_or_else(|| String::from("us-east-1")),
            bucket: lookup("S3_BUCKET").unwrap_or_else(|| String::from("videos")),
            access_key_id: lookup("AWS_ACCESS_KEY_ID"),
            secret_access_key: lookup("AWS_SECRET_ACCESS_KEY"),
            force_path_style,
        })
    }
}

impl PipelineConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let ladder = match lookup("QUALITY_LADDER") {
            Some(spec) => parse_ladder(&spec).map_err(|e| invalid("QUALITY_LADDER", e))?,
            None => defaults.ladder,
        };
        let segment_seconds: u32 = parse_or(&lookup, "VIDEO_SEGMENT_DURATION", defaults.segment_seconds)?;
        if segment_seconds == 0 {
            return Err(invalid("VIDEO_SEGMENT_DURATION", "must be at least 1"));
        }
        let encode_parallelism: usize =
            parse_or(&lookup, "ENCODE_PARALLELISM", defaults.encode_parallelism)?;

        Ok(Self {
            ladder,
            segment_seconds,
            work_root: lookup("WORK_DIR").map(PathBuf::from).unwrap_or(defaults.work_root),
            encode_parallelism: encode_parallelism.max(1),
            thumbnail: defaults.thumbnail,
        })
    }
}

fn invalid(name: &'static str, detail: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        name,
        detail: detail.into(),
    }
}

fn parse_or<T>(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| invalid(name, e.to_string())),
        None => Ok(default),
    }
}

fn parse_bool(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(invalid(name, format!("expected a boolean, got '{}'", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://db/app")])).unwrap();
        assert_eq!(config.pipeline, PipelineConfig::default());
        assert_eq!(config.pipeline.segment_seconds, 10);
        assert_eq!(config.pipeline.work_root, PathBuf::from("/tmp/videos"));
        assert_eq!(config.storage.bucket, "videos");
        assert!(!config.storage.force_path_style);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.temp_max_age, Duration::from_secs(86_400));
    }

    #[test]
    fn test_database_url_required() {
        let err = WorkerConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn test_custom_ladder_and_minio() {
        let config = WorkerConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://db/app"),
            ("QUALITY_LADDER", "360p:640x360:800:96,720p:1280x720:2800:128"),
            ("S3_ENDPOINT", "http://minio:9000"),
            ("VIDEO_SEGMENT_DURATION", "6"),
        ]))
        .unwrap();
        let names: Vec<_> = config.pipeline.ladder.iter().map(|q| q.name.as_str()).collect();
        assert_eq!(names, ["360p", "720p"]);
        assert_eq!(config.pipeline.segment_seconds, 6);
        assert_eq!(config.storage.endpoint.as_deref(), Some("http://minio:9000"));
        assert!(config.storage.force_path_style);
    }

    #[test]
    fn test_invalid_values() {
        let err = PipelineConfig::from_lookup(lookup_from(&[("VIDEO_SEGMENT_DURATION", "ten")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "VIDEO_SEGMENT_DURATION", .. }));

        let err = StorageConfig::from_lookup(lookup_from(&[("S3_FORCE_PATH_STYLE", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "S3_FORCE_PATH_STYLE", .. }));

        assert!(PipelineConfig::from_lookup(lookup_from(&[("QUALITY_LADDER", "")])).is_err());
    }
}
