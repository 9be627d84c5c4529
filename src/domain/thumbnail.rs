//! Representative frame selection.

use super::quality::Resolution;
use serde::{Deserialize, Serialize};

/// Seek position used when the duration is unknown or too short.
pub const FALLBACK_PICK_SECS: f64 = 1.0;
const MIN_PICK_SECS: f64 = 2.0;

/// Where to grab the thumbnail frame, in seconds from the start.
///
/// 10% into the video, but no earlier than 2s (skips black/title frames) and
/// no later than one second before the end.
pub fn pick_time(duration_secs: u32) -> f64 {
    if duration_secs <= 2 {
        return FALLBACK_PICK_SECS;
    }
    let duration = f64::from(duration_secs);
    (duration * 0.1).min(duration - 1.0).max(MIN_PICK_SECS)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailSettings {
    pub size: Resolution,
    pub extension: String,
}

impl Default for ThumbnailSettings {
    fn default() -> Self {
        Self {
            size: Resolution::new(1280, 720),
            extension: "jpg".to_string(),
        }
    }
}
