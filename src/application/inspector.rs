//! Media inspection. Duration is informational, so failures degrade to 0.

use crate::ports::media::MediaToolkit;
use std::path::Path;
use tracing::{debug, warn};

/// Whole seconds of `source`, truncated. 0 when the probe fails.
pub async fn inspect_duration<M>(toolkit: &M, source: &Path) -> u32
where
    M: MediaToolkit + ?Sized,
{
    match toolkit.probe_duration(source).await {
        Ok(seconds) if seconds.is_finite() && seconds >= 0.0 => {
            debug!(seconds, "Probed duration");
            seconds.min(f64::from(u32::MAX)) as u32
        }
        Ok(seconds) => {
            warn!(seconds, "Probe returned an unusable duration");
            0
        }
        Err(e) => {
            warn!(error = %e, source = %source.display(), "Duration probe failed");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use crate::ports::media::MockMediaToolkit;

    #[tokio::test]
    async fn test_truncates_to_whole_seconds() {
        let mut toolkit = MockMediaToolkit::new();
        toolkit.expect_probe_duration().returning(|_| Ok(12.98));
        assert_eq!(inspect_duration(&toolkit, Path::new("in.mp4")).await, 12);
    }

    #[tokio::test]
    async fn test_probe_failure_is_zero() {
        let mut toolkit = MockMediaToolkit::new();
        toolkit.expect_probe_duration().returning(|_| {
            Err(ToolError::Failed {
                tool: "ffprobe",
                status: "exit status: 1".into(),
                stderr: "moov atom not found".into(),
            })
        });
        assert_eq!(inspect_duration(&toolkit, Path::new("in.mp4")).await, 0);
    }

    #[tokio::test]
    async fn test_unusable_duration_is_zero() {
        let mut toolkit = MockMediaToolkit::new();
        toolkit.expect_probe_duration().returning(|_| Ok(-3.0));
        assert_eq!(inspect_duration(&toolkit, Path::new("in.mp4")).await, 0);
    }
}
