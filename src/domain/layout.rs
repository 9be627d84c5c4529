//! Object storage key layout and content types.
//!
//! ```text
//! videos/<id>/master.m3u8
//! videos/<id>/<quality>/playlist.m3u8
//! videos/<id>/<quality>/segment_000.ts
//! thumbnails/<id>.<ext>
//! ```

use super::video::VideoId;
use std::path::{Component, Path};

pub const VIDEOS_PREFIX: &str = "videos";
pub const THUMBNAILS_PREFIX: &str = "thumbnails";
pub const MASTER_PLAYLIST: &str = "master.m3u8";
pub const VARIANT_PLAYLIST: &str = "playlist.m3u8";
/// ffmpeg output pattern for segment files
pub const SEGMENT_PATTERN: &str = "segment_%03d.ts";
pub const FIRST_SEGMENT: &str = "segment_000.ts";

pub const PLAYLIST_CONTENT_TYPE: &str = "application/x-mpegURL";
pub const SEGMENT_CONTENT_TYPE: &str = "video/MP2T";
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

pub fn video_prefix(video_id: VideoId) -> String {
    format!("{}/{}", VIDEOS_PREFIX, video_id)
}

pub fn master_playlist_key(video_id: VideoId) -> String {
    format!("{}/{}", video_prefix(video_id), MASTER_PLAYLIST)
}

pub fn variant_playlist_key(video_id: VideoId, quality: &str) -> String {
    format!("{}/{}/{}", video_prefix(video_id), quality, VARIANT_PLAYLIST)
}

pub fn first_segment_key(video_id: VideoId, quality: &str) -> String {
    format!("{}/{}/{}", video_prefix(video_id), quality, FIRST_SEGMENT)
}

pub fn thumbnail_key(video_id: VideoId, extension: &str) -> String {
    format!("{}/{}.{}", THUMBNAILS_PREFIX, video_id, extension)
}

/// Relative reference from the master manifest to a variant playlist.
pub fn variant_playlist_ref(quality: &str) -> String {
    format!("{}/{}", quality, VARIANT_PLAYLIST)
}

/// Joins a prefix and a relative path with `/`, whatever the host separator.
/// Returns `None` for paths that would escape the prefix.
pub fn object_key(prefix: &str, relative: &Path) -> Option<String> {
    let mut key = prefix.trim_end_matches('/').to_string();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                key.push('/');
                key.push_str(part.to_str()?);
            }
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(key)
}

pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("m3u8") => PLAYLIST_CONTENT_TYPE,
        Some("ts") => SEGMENT_CONTENT_TYPE,
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => DEFAULT_CONTENT_TYPE,
    }
}
