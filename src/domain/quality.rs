//! Quality profiles and the encoding ladder.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once('x')
            .ok_or_else(|| format!("resolution '{}' is not WxH", s))?;
        let width = w
            .trim()
            .parse()
            .map_err(|_| format!("bad width in '{}'", s))?;
        let height = h
            .trim()
            .parse()
            .map_err(|_| format!("bad height in '{}'", s))?;
        if width == 0 || height == 0 {
            return Err(format!("resolution '{}' has a zero dimension", s));
        }
        Ok(Resolution { width, height })
    }
}

/// A named encoding target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityProfile {
    pub name: String,
    pub resolution: Resolution,
    pub video_bitrate_kbps: u32,
    pub audio_bitrate_kbps: u32,
}

impl QualityProfile {
    pub fn new(
        name: impl Into<String>,
        resolution: Resolution,
        video_bitrate_kbps: u32,
        audio_bitrate_kbps: u32,
    ) -> Self {
        Self {
            name: name.into(),
            resolution,
            video_bitrate_kbps,
            audio_bitrate_kbps,
        }
    }

    /// Advertised BANDWIDTH in the master manifest, bits per second.
    pub fn bandwidth(&self) -> u64 {
        u64::from(self.video_bitrate_kbps) * 1000
    }
}

impl FromStr for QualityProfile {
    type Err = String;

    /// Parses `name:WxH:videoKbps:audioKbps`, e.g. `720p:1280x720:2800:128`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        let [name, resolution, video, audio] = parts.as_slice() else {
            return Err(format!(
                "quality '{}' must look like name:WxH:videoKbps:audioKbps",
                s
            ));
        };
        if name.is_empty() {
            return Err(format!("quality '{}' has no name", s));
        }
        let video_bitrate_kbps = video
            .trim_end_matches('k')
            .parse()
            .map_err(|_| format!("bad video bitrate in '{}'", s))?;
        let audio_bitrate_kbps = audio
            .trim_end_matches('k')
            .parse()
            .map_err(|_| format!("bad audio bitrate in '{}'", s))?;
        Ok(QualityProfile::new(
            *name,
            resolution.parse()?,
            video_bitrate_kbps,
            audio_bitrate_kbps,
        ))
    }
}

/// 360p, 480p, 720p, 1080p in ascending order.
pub fn default_ladder() -> Vec<QualityProfile> {
    vec![
        QualityProfile::new("360p", Resolution::new(640, 360), 800, 96),
        QualityProfile::new("480p", Resolution::new(854, 480), 1400, 128),
        QualityProfile::new("720p", Resolution::new(1280, 720), 2800, 128),
        QualityProfile::new("1080p", Resolution::new(1920, 1080), 5000, 192),
    ]
}

/// Parses a comma separated ladder. Names must be unique.
pub fn parse_ladder(s: &str) -> Result<Vec<QualityProfile>, String> {
    let ladder = s
        .split(',')
        .filter(|entry| !entry.trim().is_empty())
        .map(QualityProfile::from_str)
        .collect::<Result<Vec<_>, _>>()?;

    if ladder.is_empty() {
        return Err("quality ladder is empty".to_string());
    }
    for (i, profile) in ladder.iter().enumerate() {
        if ladder[..i].iter().any(|p| p.name == profile.name) {
            return Err(format!("quality '{}' listed twice", profile.name));
        }
    }
    Ok(ladder)
}
