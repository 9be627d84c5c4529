//! Per-job scratch space, removed when the job ends however it ends.

use crate::domain::video::VideoId;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Owns `<work_root>/processed_<id>/` and the uploaded input file. Both are
/// deleted on drop.
#[derive(Debug)]
pub struct JobWorkspace {
    dir: PathBuf,
    input: PathBuf,
}

impl JobWorkspace {
    /// Takes ownership of `input` first so it is cleaned up even if the
    /// working directory cannot be created.
    pub async fn create(work_root: &Path, video_id: VideoId, input: &Path) -> Result<Self, io::Error> {
        let workspace = Self {
            dir: work_root.join(format!("processed_{}", video_id)),
            input: input.to_path_buf(),
        };

        // Leftovers from a crashed attempt would otherwise be published.
        match tokio::fs::remove_dir_all(&workspace.dir).await {
            Ok(()) => debug!(dir = %workspace.dir.display(), "Removed stale working directory"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        tokio::fs::create_dir_all(&workspace.dir).await?;
        Ok(workspace)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn input(&self) -> &Path {
        &self.input
    }
}

impl Drop for JobWorkspace {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(dir = %self.dir.display(), error = %e, "Failed to remove working directory");
            }
        }
        if let Err(e) = std::fs::remove_file(&self.input) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(input = %self.input.display(), error = %e, "Failed to remove input file");
            }
        }
    }
}
