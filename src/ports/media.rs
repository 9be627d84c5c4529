use crate::domain::quality::{QualityProfile, Resolution};
use crate::error::ToolError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// External probing / encoding toolchain. Every call is a blocking process
/// invocation from the pipeline's point of view.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Container duration in seconds.
    async fn probe_duration(&self, source: &Path) -> Result<f64, ToolError>;

    /// Encode `source` into a segmented playlist inside `output_dir`.
    /// Returns the path of the written playlist.
    async fn encode_rendition(
        &self,
        source: &Path,
        output_dir: &Path,
        profile: &QualityProfile,
        segment_seconds: u32,
    ) -> Result<PathBuf, ToolError>;

    /// Write one frame taken `at_seconds` into `source` to `output`, scaled to `size`.
    async fn extract_frame(
        &self,
        source: &Path,
        at_seconds: f64,
        size: Resolution,
        output: &Path,
    ) -> Result<(), ToolError>;
}
