// Media inspection and encoder command construction
//
// - Probe: runs the probe tool and maps its output onto ProbeData
// - Analyzer: best-effort MediaFile construction on top of a prober
// - Commands: encoder command builders

pub mod analyzer;
pub mod commands;
pub mod probe;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use analyzer::*;
pub use commands::*;
pub use probe::*;

use crate::config::MediaConfig;
use crate::error::Result;
use crate::formats::MediaKind;

/// Description of an input file as far as analysis could tell.
///
/// Zero values mean "unknown" for duration, dimensions, bitrate and size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaFile {
    pub path: String,
    pub kind: MediaKind,
    pub container: String,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    /// Seconds
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    /// Bits per second
    pub bitrate: u64,
    /// Bytes
    pub size: u64,
}

impl MediaFile {
    /// Placeholder for a path that could not be read at all.
    pub fn missing<P: AsRef<Path>>(path: P) -> Self {
        Self::minimal(path, MediaKind::Unknown, 0)
    }

    /// Only what the filesystem told us: path, kind by extension, size.
    pub fn minimal<P: AsRef<Path>>(path: P, kind: MediaKind, size: u64) -> Self {
        Self {
            path: path.as_ref().to_string_lossy().to_string(),
            kind,
            container: String::new(),
            video_codec: None,
            audio_codec: None,
            duration: 0.0,
            width: 0,
            height: 0,
            bitrate: 0,
            size,
        }
    }

    pub fn from_probe<P: AsRef<Path>>(path: P, size: u64, probe: &ProbeData) -> Self {
        let path = path.as_ref();

        let video = probe
            .streams
            .iter()
            .find(|s| s.kind == StreamKind::Video && !s.cover_art);
        let audio = probe.streams.iter().find(|s| s.kind == StreamKind::Audio);
        let has_subtitles = probe.streams.iter().any(|s| s.kind == StreamKind::Subtitle);

        let kind = if video.is_some() {
            MediaKind::Video
        } else if audio.is_some() {
            MediaKind::Audio
        } else if has_subtitles {
            MediaKind::Subtitle
        } else {
            MediaKind::from_path(path)
        };

        let container = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .or_else(|| {
                probe
                    .format_name
                    .as_deref()
                    .and_then(|name| name.split(',').next())
                    .map(str::to_string)
            })
            .unwrap_or_default();

        Self {
            path: path.to_string_lossy().to_string(),
            kind,
            container,
            video_codec: video.and_then(|s| s.codec.clone()),
            audio_codec: audio.and_then(|s| s.codec.clone()),
            duration: probe
                .duration
                .filter(|d| d.is_finite() && *d > 0.0)
                .unwrap_or(0.0),
            width: video.map(|s| s.width).unwrap_or(0),
            height: video.map(|s| s.height).unwrap_or(0),
            bitrate: probe.bitrate.unwrap_or(0),
            size: if size > 0 { size } else { probe.size.unwrap_or(0) },
        }
    }

    pub fn path_buf(&self) -> PathBuf {
        PathBuf::from(&self.path)
    }

    pub fn has_known_duration(&self) -> bool {
        self.duration > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    pub kind: StreamKind,
    pub codec: Option<String>,
    pub width: u32,
    pub height: u32,
    /// Embedded cover art shows up as a video stream
    pub cover_art: bool,
}

/// Tool-independent result of probing a file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProbeData {
    pub format_name: Option<String>,
    pub duration: Option<f64>,
    pub bitrate: Option<u64>,
    pub size: Option<u64>,
    pub streams: Vec<StreamInfo>,
}

/// Main trait for probing media files
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaProbeTrait: Send + Sync {
    /// Inspect a file's container and streams
    async fn probe(&self, path: &Path) -> Result<ProbeData>;

    /// Check if the probe tool is available
    fn check_availability(&self) -> Result<()>;
}

/// Factory for creating prober instances
pub struct MediaProbeFactory;

impl MediaProbeFactory {
    /// Create the default prober implementation (ffprobe-based)
    pub fn create_prober(config: &MediaConfig) -> Box<dyn MediaProbeTrait> {
        Box::new(probe::FfprobeProber::new(&config.ffprobe_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(kind: StreamKind, codec: &str) -> StreamInfo {
        StreamInfo {
            kind,
            codec: Some(codec.to_string()),
            width: 0,
            height: 0,
            cover_art: false,
        }
    }

    #[test]
    fn test_from_probe_video() {
        let mut video = stream(StreamKind::Video, "h264");
        video.width = 1280;
        video.height = 720;
        let probe = ProbeData {
            format_name: Some("mov,mp4,m4a,3gp,3g2,mj2".to_string()),
            duration: Some(60.0),
            bitrate: Some(1_000_000),
            size: Some(7_500_000),
            streams: vec![video, stream(StreamKind::Audio, "aac")],
        };

        let media = MediaFile::from_probe("/tmp/clip.MP4", 7_500_000, &probe);
        assert_eq!(media.kind, MediaKind::Video);
        assert_eq!(media.container, "mp4");
        assert_eq!(media.video_codec.as_deref(), Some("h264"));
        assert_eq!(media.audio_codec.as_deref(), Some("aac"));
        assert_eq!((media.width, media.height), (1280, 720));
        assert_eq!(media.duration, 60.0);
    }

    #[test]
    fn test_cover_art_does_not_make_a_video() {
        let mut art = stream(StreamKind::Video, "mjpeg");
        art.cover_art = true;
        let probe = ProbeData {
            streams: vec![art, stream(StreamKind::Audio, "mp3")],
            ..Default::default()
        };

        let media = MediaFile::from_probe("/tmp/song.mp3", 10, &probe);
        assert_eq!(media.kind, MediaKind::Audio);
        assert_eq!(media.video_codec, None);
        assert_eq!(media.duration, 0.0);
    }

    #[test]
    fn test_container_falls_back_to_format_name() {
        let probe = ProbeData {
            format_name: Some("matroska,webm".to_string()),
            ..Default::default()
        };
        let media = MediaFile::from_probe("/tmp/noext", 1, &probe);
        assert_eq!(media.container, "matroska");
        assert_eq!(media.kind, MediaKind::Unknown);
    }

    #[test]
    fn test_missing_is_zeroed() {
        let media = MediaFile::missing("/nope.mp4");
        assert_eq!(media.path, "/nope.mp4");
        assert_eq!(media.kind, MediaKind::Unknown);
        assert_eq!(media.size, 0);
        assert!(media.container.is_empty());
        assert!(!media.has_known_duration());
    }
}
