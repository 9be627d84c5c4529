//! HLS playlists: the master manifest we write and the variant playlists the
//! encoder writes.

use super::layout::variant_playlist_ref;
use super::quality::{QualityProfile, Resolution};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

pub const MASTER_VERSION: u8 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct MediaSegment {
    pub duration: f64,
    pub uri: String,
}

/// A variant (media) playlist as produced by the encoder.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaPlaylist {
    pub version: Option<u8>,
    pub target_duration: Option<u64>,
    pub segments: Vec<MediaSegment>,
    pub end_list: bool,
}

impl MediaPlaylist {
    /// Parses the subset of tags we rely on. Unknown tags are ignored.
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

        match lines.next() {
            Some("#EXTM3U") => {}
            _ => return Err("playlist does not start with #EXTM3U".to_string()),
        }

        let mut playlist = MediaPlaylist::default();
        let mut pending_duration: Option<f64> = None;

        for line in lines {
            if let Some(v) = line.strip_prefix("#EXT-X-VERSION:") {
                playlist.version = v.parse().ok();
            } else if let Some(v) = line.strip_prefix("#EXT-X-TARGETDURATION:") {
                playlist.target_duration = v.parse().ok();
            } else if let Some(v) = line.strip_prefix("#EXTINF:") {
                let duration = v.split(',').next().unwrap_or_default();
                pending_duration = Some(
                    duration
                        .parse()
                        .map_err(|_| format!("bad segment duration '{}'", duration))?,
                );
            } else if line == "#EXT-X-ENDLIST" {
                playlist.end_list = true;
            } else if line.starts_with('#') {
                continue;
            } else {
                let duration = pending_duration
                    .take()
                    .ok_or_else(|| format!("segment '{}' has no #EXTINF", line))?;
                playlist.segments.push(MediaSegment {
                    duration,
                    uri: line.to_string(),
                });
            }
        }

        Ok(playlist)
    }

    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration).sum()
    }
}

/// One `#EXT-X-STREAM-INF` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantStream {
    pub bandwidth: u64,
    pub resolution: Resolution,
    pub uri: String,
}

impl From<&QualityProfile> for VariantStream {
    fn from(profile: &QualityProfile) -> Self {
        Self {
            bandwidth: profile.bandwidth(),
            resolution: profile.resolution,
            uri: variant_playlist_ref(&profile.name),
        }
    }
}

/// Master manifest listing one variant per successfully encoded quality, in
/// the order given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterPlaylist {
    pub variants: Vec<VariantStream>,
}

impl MasterPlaylist {
    pub fn from_profiles<'a>(profiles: impl IntoIterator<Item = &'a QualityProfile>) -> Self {
        Self {
            variants: profiles.into_iter().map(VariantStream::from).collect(),
        }
    }

    pub fn render(&self) -> String {
        let mut out = format!("#EXTM3U\n#EXT-X-VERSION:{}\n\n", MASTER_VERSION);
        for variant in &self.variants {
            out.push_str(&format!(
                "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION={}\n{}\n\n",
                variant.bandwidth, variant.resolution, variant.uri
            ));
        }
        out
    }

    pub async fn write_to(&self, path: &Path) -> Result<(), std::io::Error> {
        let mut file = File::create(path).await?;
        file.write_all(self.render().as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
