//! The transcoding pipeline: one job, one video, one terminal status.

use crate::application::encoder::encode_ladder;
use crate::application::inspector::inspect_duration;
use crate::application::maintenance::regenerate_thumbnails;
use crate::application::publisher::publish_tree;
use crate::application::reconciler::StateReconciler;
use crate::application::thumbnail::generate_thumbnail;
use crate::application::workspace::JobWorkspace;
use crate::config::PipelineConfig;
use crate::domain::hls::MasterPlaylist;
use crate::domain::jobs::TranscodeJob;
use crate::domain::layout::{master_playlist_key, video_prefix, MASTER_PLAYLIST};
use crate::domain::pipeline::{FatalCause, JobReport, PipelineOutcome, Progress, Stage};
use crate::domain::video::VideoId;
use crate::error::{PipelineError, RepositoryError};
use crate::ports::media::MediaToolkit;
use crate::ports::progress::ProgressSink;
use crate::ports::repository::VideoRepository;
use crate::ports::storage::ObjectStorage;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

pub struct TranscodePipeline<M, S, R, P> {
    toolkit: Arc<M>,
    storage: Arc<S>,
    repo: Arc<R>,
    progress: Arc<P>,
    reconciler: StateReconciler<R>,
    config: Arc<PipelineConfig>,
}

impl<M, S, R, P> TranscodePipeline<M, S, R, P>
where
    M: MediaToolkit,
    S: ObjectStorage,
    R: VideoRepository,
    P: ProgressSink,
{
    pub fn new(
        toolkit: Arc<M>,
        storage: Arc<S>,
        repo: Arc<R>,
        progress: Arc<P>,
        config: Arc<PipelineConfig>,
    ) -> Self {
        Self {
            toolkit,
            storage,
            reconciler: StateReconciler::new(repo.clone()),
            repo,
            progress,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn run_job(&self, job: &TranscodeJob) -> Result<JobReport, PipelineError> {
        self.run(job.video_id, &job.source_path).await
    }

    /// Run the pipeline for `video_id` over the uploaded file at `source`.
    ///
    /// Fatal conditions come back as `PipelineOutcome::Fatal` with the video
    /// already marked failed. `Err` means the failure itself could not be
    /// recorded. The input file and working directory are gone on return.
    pub async fn run(&self, video_id: VideoId, source: &Path) -> Result<JobReport, PipelineError> {
        let started = Instant::now();
        self.report(video_id, Progress::at(Stage::Start, 0)).await;

        let workspace = match JobWorkspace::create(&self.config.work_root, video_id, source).await {
            Ok(workspace) => workspace,
            Err(e) => {
                return self
                    .fail(video_id, Stage::Start, FatalCause::Workspace(e.to_string()), 0)
                    .await
            }
        };

        match self.repo.get_video(video_id).await {
            Ok(Some(_)) => {}
            Ok(None) => return self.fail(video_id, Stage::Start, FatalCause::VideoNotFound, 0).await,
            Err(e) => {
                return self
                    .fail(video_id, Stage::Start, FatalCause::Repository(e.to_string()), 0)
                    .await
            }
        }

        // Probe
        self.report(video_id, Progress::at(Stage::Probe, 5)).await;
        match tokio::fs::try_exists(workspace.input()).await {
            Ok(true) => {}
            Ok(false) => {
                return self
                    .fail(video_id, Stage::Probe, FatalCause::InputMissing, 0)
                    .await
            }
            Err(e) => {
                return self
                    .fail(video_id, Stage::Probe, FatalCause::Workspace(e.to_string()), 0)
                    .await
            }
        }
        let duration = inspect_duration(self.toolkit.as_ref(), workspace.input()).await;
        // 0 means unknown; keep whatever an earlier attempt recorded
        if duration > 0 {
            self.reconciler.record_duration(video_id, duration).await;
        }

        // Encode
        let encoded = encode_ladder(
            self.toolkit.as_ref(),
            self.progress.as_ref(),
            video_id,
            workspace.input(),
            workspace.dir(),
            &self.config.ladder,
            self.config.segment_seconds,
            self.config.encode_parallelism,
        )
        .await;
        if encoded.is_empty() {
            return self
                .fail(video_id, Stage::Encode, FatalCause::NoRenditions, duration)
                .await;
        }

        // Assemble
        let master = MasterPlaylist::from_profiles(encoded.succeeded.iter().map(|r| &r.profile));
        if let Err(e) = master.write_to(&workspace.dir().join(MASTER_PLAYLIST)).await {
            return self
                .fail(video_id, Stage::Assemble, FatalCause::Assembly(e.to_string()), duration)
                .await;
        }

        // Thumbnail
        self.report(video_id, Progress::at(Stage::Thumbnail, 75)).await;
        if let Err(e) = self.storage.ensure_container().await {
            warn!(video_id, error = %e, "Object storage container unavailable");
            return self
                .fail(video_id, Stage::Publish, FatalCause::PublishFailed, duration)
                .await;
        }
        let thumbnail = generate_thumbnail(
            self.toolkit.as_ref(),
            self.storage.as_ref(),
            workspace.input(),
            video_id,
            duration,
            &self.config.thumbnail,
        )
        .await;

        // Publish
        self.report(video_id, Progress::at(Stage::Publish, 85)).await;
        let keys = publish_tree(self.storage.as_ref(), workspace.dir(), &video_prefix(video_id)).await;
        if keys.is_empty() {
            return self
                .fail(video_id, Stage::Publish, FatalCause::PublishFailed, duration)
                .await;
        }
        info!(video_id, objects = keys.len(), "Published artifacts");

        // Reconcile
        self.report(video_id, Progress::at(Stage::Reconcile, 95)).await;
        let master_key = master_playlist_key(video_id);
        if let Err(e) = self
            .reconciler
            .reconcile_success(video_id, &master_key, thumbnail.clone(), &encoded.succeeded)
            .await
        {
            return self
                .fail(video_id, Stage::Reconcile, FatalCause::Repository(e.to_string()), duration)
                .await;
        }

        self.report(video_id, Progress::at(Stage::Done, 100)).await;
        let qualities: Vec<String> = encoded
            .succeeded
            .iter()
            .map(|r| r.profile.name.clone())
            .collect();
        let outcome = if encoded.failed.is_empty() {
            PipelineOutcome::Success { qualities }
        } else {
            warn!(video_id, failed = ?encoded.failed, "Published with missing qualities");
            PipelineOutcome::Partial {
                qualities,
                failed: encoded.failed,
            }
        };
        info!(
            video_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Transcode finished"
        );

        Ok(JobReport {
            video_id,
            outcome,
            duration_secs: duration,
            master_playlist_key: Some(master_key),
            thumbnail_key: thumbnail,
        })
    }

    /// Error edge: force `failed` and report the cause.
    async fn fail(
        &self,
        video_id: VideoId,
        stage: Stage,
        cause: FatalCause,
        duration: u32,
    ) -> Result<JobReport, PipelineError> {
        error!(video_id, %stage, %cause, "Transcode failed");
        self.report(video_id, Progress::failed()).await;
        self.reconciler.force_failed(video_id).await?;

        Ok(JobReport {
            video_id,
            outcome: PipelineOutcome::Fatal { stage, cause },
            duration_secs: duration,
            master_playlist_key: None,
            thumbnail_key: None,
        })
    }

    async fn report(&self, video_id: VideoId, progress: Progress) {
        self.progress.report(video_id, progress).await;
    }

    /// Backfill thumbnails for published videos that have none.
    pub async fn regenerate_missing_thumbnails(&self) -> Result<usize, RepositoryError> {
        regenerate_thumbnails(
            self.toolkit.as_ref(),
            self.storage.as_ref(),
            self.repo.as_ref(),
            &self.reconciler,
            &self.config.work_root,
            &self.config.thumbnail,
        )
        .await
    }
}
