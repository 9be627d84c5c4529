//! Test doubles shared by the application tests.

use crate::adapters::local::{FsStorage, InMemoryProgress, InMemoryVideoRepository};
use crate::application::orchestrator::TranscodePipeline;
use crate::config::PipelineConfig;
use crate::domain::quality::{QualityProfile, Resolution};
use crate::domain::video::{Video, VideoId};
use crate::error::{StorageError, ToolError};
use crate::ports::media::MediaToolkit;
use crate::ports::storage::ObjectStorage;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Writes plausible ffmpeg output without running ffmpeg.
#[derive(Default)]
pub struct ScriptedToolkit {
    pub duration: Option<f64>,
    pub failing_qualities: HashSet<String>,
    pub frame_fails: bool,
}

impl ScriptedToolkit {
    pub fn new(duration: f64) -> Self {
        Self {
            duration: Some(duration),
            ..Self::default()
        }
    }

    pub fn failing(mut self, qualities: &[&str]) -> Self {
        self.failing_qualities = qualities.iter().map(|q| q.to_string()).collect();
        self
    }
}

/// ffmpeg exits non-zero when its input does not exist.
fn require_input(tool: &'static str, source: &Path) -> Result<(), ToolError> {
    if source.exists() {
        return Ok(());
    }
    Err(ToolError::Failed {
        tool,
        status: "exit status: 1".into(),
        stderr: format!("{}: No such file or directory", source.display()),
    })
}

#[async_trait]
impl MediaToolkit for ScriptedToolkit {
    async fn probe_duration(&self, source: &Path) -> Result<f64, ToolError> {
        require_input("ffprobe", source)?;
        self.duration.ok_or(ToolError::InvalidOutput {
            tool: "ffprobe",
            detail: "N/A".into(),
        })
    }

    async fn encode_rendition(
        &self,
        source: &Path,
        output_dir: &Path,
        profile: &QualityProfile,
        segment_seconds: u32,
    ) -> Result<PathBuf, ToolError> {
        require_input("ffmpeg", source)?;
        tokio::fs::create_dir_all(output_dir).await?;
        if self.failing_qualities.contains(&profile.name) {
            // Partial output, as a crashed encoder leaves it
            tokio::fs::write(output_dir.join("segment_000.ts"), b"partial").await?;
            return Err(ToolError::Failed {
                tool: "ffmpeg",
                status: "exit status: 1".into(),
                stderr: format!("{} encoder crashed", profile.name),
            });
        }

        let mut playlist = format!(
            "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:{}\n",
            segment_seconds
        );
        for i in 0..2 {
            let name = format!("segment_{:03}.ts", i);
            tokio::fs::write(output_dir.join(&name), vec![0u8; 512]).await?;
            playlist.push_str(&format!("#EXTINF:{}.0,\n{}\n", segment_seconds, name));
        }
        playlist.push_str("#EXT-X-ENDLIST\n");
        let path = output_dir.join("playlist.m3u8");
        tokio::fs::write(&path, playlist).await?;
        Ok(path)
    }

    async fn extract_frame(
        &self,
        source: &Path,
        _at_seconds: f64,
        _size: Resolution,
        output: &Path,
    ) -> Result<(), ToolError> {
        require_input("ffmpeg", source)?;
        if self.frame_fails {
            return Err(ToolError::MissingOutput(output.to_path_buf()));
        }
        tokio::fs::write(output, b"jpeg").await?;
        Ok(())
    }
}

/// `FsStorage` whose writes can be switched off.
pub struct SwitchableStorage {
    inner: FsStorage,
    pub reject_puts: AtomicBool,
    pub reject_container: AtomicBool,
    puts: AtomicUsize,
}

impl SwitchableStorage {
    pub fn new(inner: FsStorage) -> Self {
        Self {
            inner,
            reject_puts: AtomicBool::new(false),
            reject_container: AtomicBool::new(false),
            puts: AtomicUsize::new(0),
        }
    }

    /// Attempted uploads, rejected ones included.
    pub fn put_attempts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn object_path(&self, key: &str) -> PathBuf {
        self.inner.object_path(key)
    }
}

#[async_trait]
impl ObjectStorage for SwitchableStorage {
    async fn ensure_container(&self) -> Result<(), StorageError> {
        if self.reject_container.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("bucket unreachable".into()));
        }
        self.inner.ensure_container().await
    }

    async fn put_file(
        &self,
        key: &str,
        local_path: &Path,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.reject_puts.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("access denied".into()));
        }
        self.inner.put_file(key, local_path, content_type).await
    }

    async fn download(&self, key: &str, local_path: &Path) -> Result<(), StorageError> {
        self.inner.download(key, local_path).await
    }
}

pub type TestPipeline =
    TranscodePipeline<ScriptedToolkit, SwitchableStorage, InMemoryVideoRepository, InMemoryProgress>;

/// A pipeline over a temp work root, a temp bucket and an in-memory store.
pub struct Harness {
    pub work: TempDir,
    pub bucket: TempDir,
    pub storage: Arc<SwitchableStorage>,
    pub repo: Arc<InMemoryVideoRepository>,
    pub progress: Arc<InMemoryProgress>,
    pub pipeline: Arc<TestPipeline>,
}

impl Harness {
    pub fn new(toolkit: ScriptedToolkit) -> Self {
        Self::with_config(toolkit, |_| {})
    }

    pub fn with_config(toolkit: ScriptedToolkit, adjust: impl FnOnce(&mut PipelineConfig)) -> Self {
        let work = tempfile::tempdir().unwrap();
        let bucket = tempfile::tempdir().unwrap();
        let storage = Arc::new(SwitchableStorage::new(FsStorage::new(bucket.path(), "videos")));
        let repo = Arc::new(InMemoryVideoRepository::new());
        let progress = Arc::new(InMemoryProgress::new());

        let mut config = PipelineConfig {
            work_root: work.path().to_path_buf(),
            ..PipelineConfig::default()
        };
        adjust(&mut config);

        let pipeline = Arc::new(TranscodePipeline::new(
            Arc::new(toolkit),
            storage.clone(),
            repo.clone(),
            progress.clone(),
            Arc::new(config),
        ));
        Self {
            work,
            bucket,
            storage,
            repo,
            progress,
            pipeline,
        }
    }

    /// Seed a `processing` row and drop an upload next to the work dirs.
    pub async fn upload(&self, video_id: VideoId) -> PathBuf {
        self.repo
            .insert_video(Video::processing(video_id, format!("clip {}", video_id)))
            .await;
        let input = self.work.path().join(format!("upload_{}.mp4", video_id));
        tokio::fs::write(&input, b"raw video").await.unwrap();
        input
    }

    pub fn object(&self, key: &str) -> PathBuf {
        self.storage.object_path(key)
    }
}
