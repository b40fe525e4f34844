//! Closed sets of containers, codecs and presets understood by henkan.
//!
//! Every value carries its own metadata (file extension, codec identifier as
//! reported by ffprobe, encoder name passed to ffmpeg). Names coming from the
//! command line or the configuration file are parsed into these enums up
//! front, so an unknown format is rejected instead of silently replaced.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::HenkanError;

/// Broad category of a media file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
    Subtitle,
    Unknown,
}

const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "mov", "webm", "avi", "wmv", "flv", "m4v", "mpg", "mpeg", "ts",
];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "flac", "wav", "ogg", "aac", "opus", "wma"];
const SUBTITLE_EXTENSIONS: &[&str] = &["srt", "ass", "ssa", "vtt", "sub"];

impl MediaKind {
    /// Classify by extension alone.
    pub fn from_extension(extension: &str) -> Self {
        let extension = extension.to_ascii_lowercase();
        let extension = extension.as_str();
        if VIDEO_EXTENSIONS.contains(&extension) {
            Self::Video
        } else if AUDIO_EXTENSIONS.contains(&extension) {
            Self::Audio
        } else if SUBTITLE_EXTENSIONS.contains(&extension) {
            Self::Subtitle
        } else {
            Self::Unknown
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    /// Whether files of this kind can be fed to the encoder.
    pub fn is_convertible(&self) -> bool {
        matches!(self, Self::Video | Self::Audio)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Subtitle => "subtitle",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    #[serde(alias = "x264", alias = "avc")]
    H264,
    #[serde(alias = "h265", alias = "x265")]
    Hevc,
    Vp9,
    Mpeg4,
}

impl VideoCodec {
    pub const ALL: [VideoCodec; 4] = [Self::H264, Self::Hevc, Self::Vp9, Self::Mpeg4];

    /// Codec identifier as ffprobe reports it.
    pub fn id(&self) -> &'static str {
        match self {
            Self::H264 => "h264",
            Self::Hevc => "hevc",
            Self::Vp9 => "vp9",
            Self::Mpeg4 => "mpeg4",
        }
    }

    /// ffmpeg encoder name.
    pub fn encoder(&self) -> &'static str {
        match self {
            Self::H264 => "libx264",
            Self::Hevc => "libx265",
            Self::Vp9 => "libvpx-vp9",
            Self::Mpeg4 => "mpeg4",
        }
    }

    pub fn supports_preset(&self) -> bool {
        matches!(self, Self::H264 | Self::Hevc)
    }

    /// Encoder arguments expressing a CRF-style quality value.
    pub fn quality_args(&self, quality: u8) -> Vec<String> {
        match self {
            Self::H264 | Self::Hevc => vec!["-crf".to_string(), quality.min(51).to_string()],
            // libvpx-vp9 only honours -crf in constant quality mode
            Self::Vp9 => vec![
                "-crf".to_string(),
                quality.min(63).to_string(),
                "-b:v".to_string(),
                "0".to_string(),
            ],
            // mpeg4 has no CRF; map onto its 2..31 qscale range
            Self::Mpeg4 => {
                let qscale = (u32::from(quality.min(51)) * 29 / 51 + 2).min(31);
                vec!["-q:v".to_string(), qscale.to_string()]
            }
        }
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for VideoCodec {
    type Err = HenkanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "h264" | "avc" | "x264" | "libx264" => Ok(Self::H264),
            "hevc" | "h265" | "x265" | "libx265" => Ok(Self::Hevc),
            "vp9" | "libvpx-vp9" => Ok(Self::Vp9),
            "mpeg4" => Ok(Self::Mpeg4),
            other => Err(HenkanError::Validation(format!(
                "Unsupported video codec '{}'. Valid codecs: h264, hevc, vp9, mpeg4",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    Aac,
    Mp3,
    Opus,
    Vorbis,
    Flac,
    #[serde(rename = "pcm_s16le", alias = "pcm")]
    PcmS16le,
}

impl AudioCodec {
    pub const ALL: [AudioCodec; 6] = [
        Self::Aac,
        Self::Mp3,
        Self::Opus,
        Self::Vorbis,
        Self::Flac,
        Self::PcmS16le,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Self::Aac => "aac",
            Self::Mp3 => "mp3",
            Self::Opus => "opus",
            Self::Vorbis => "vorbis",
            Self::Flac => "flac",
            Self::PcmS16le => "pcm_s16le",
        }
    }

    pub fn encoder(&self) -> &'static str {
        match self {
            Self::Aac => "aac",
            Self::Mp3 => "libmp3lame",
            Self::Opus => "libopus",
            Self::Vorbis => "libvorbis",
            Self::Flac => "flac",
            Self::PcmS16le => "pcm_s16le",
        }
    }

    /// Lossless codecs take no bitrate.
    pub fn is_lossless(&self) -> bool {
        matches!(self, Self::Flac | Self::PcmS16le)
    }
}

impl fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for AudioCodec {
    type Err = HenkanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aac" => Ok(Self::Aac),
            "mp3" | "libmp3lame" => Ok(Self::Mp3),
            "opus" | "libopus" => Ok(Self::Opus),
            "vorbis" | "libvorbis" => Ok(Self::Vorbis),
            "flac" => Ok(Self::Flac),
            "pcm" | "pcm_s16le" | "wav" => Ok(Self::PcmS16le),
            other => Err(HenkanError::Validation(format!(
                "Unsupported audio codec '{}'. Valid codecs: aac, mp3, opus, vorbis, flac, pcm_s16le",
                other
            ))),
        }
    }
}

/// x264/x265 speed presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Ultrafast,
    Superfast,
    Veryfast,
    Faster,
    Fast,
    Medium,
    Slow,
    Slower,
    Veryslow,
}

impl Preset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ultrafast => "ultrafast",
            Self::Superfast => "superfast",
            Self::Veryfast => "veryfast",
            Self::Faster => "faster",
            Self::Fast => "fast",
            Self::Medium => "medium",
            Self::Slow => "slow",
            Self::Slower => "slower",
            Self::Veryslow => "veryslow",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = HenkanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ultrafast" => Ok(Self::Ultrafast),
            "superfast" => Ok(Self::Superfast),
            "veryfast" => Ok(Self::Veryfast),
            "faster" => Ok(Self::Faster),
            "fast" => Ok(Self::Fast),
            "medium" => Ok(Self::Medium),
            "slow" => Ok(Self::Slow),
            "slower" => Ok(Self::Slower),
            "veryslow" => Ok(Self::Veryslow),
            other => Err(HenkanError::Validation(format!(
                "Invalid preset '{}'. Valid presets: ultrafast, superfast, veryfast, faster, fast, medium, slow, slower, veryslow",
                other
            ))),
        }
    }
}

/// Output container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Mp4,
    Mkv,
    Mov,
    Webm,
    Avi,
    Mp3,
    M4a,
    Flac,
    Wav,
    Ogg,
}

impl Container {
    pub const ALL: [Container; 10] = [
        Self::Mp4,
        Self::Mkv,
        Self::Mov,
        Self::Webm,
        Self::Avi,
        Self::Mp3,
        Self::M4a,
        Self::Flac,
        Self::Wav,
        Self::Ogg,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mkv => "mkv",
            Self::Mov => "mov",
            Self::Webm => "webm",
            Self::Avi => "avi",
            Self::Mp3 => "mp3",
            Self::M4a => "m4a",
            Self::Flac => "flac",
            Self::Wav => "wav",
            Self::Ogg => "ogg",
        }
    }

    pub fn is_audio_only(&self) -> bool {
        matches!(
            self,
            Self::Mp3 | Self::M4a | Self::Flac | Self::Wav | Self::Ogg
        )
    }

    pub fn is_video(&self) -> bool {
        !self.is_audio_only()
    }

    /// Codec pair chosen when nothing else is requested.
    pub fn default_codecs(&self) -> (Option<VideoCodec>, AudioCodec) {
        match self {
            Self::Mp4 | Self::Mkv | Self::Mov => (Some(VideoCodec::H264), AudioCodec::Aac),
            Self::Webm => (Some(VideoCodec::Vp9), AudioCodec::Opus),
            Self::Avi => (Some(VideoCodec::Mpeg4), AudioCodec::Mp3),
            Self::Mp3 => (None, AudioCodec::Mp3),
            Self::M4a => (None, AudioCodec::Aac),
            Self::Flac => (None, AudioCodec::Flac),
            Self::Wav => (None, AudioCodec::PcmS16le),
            Self::Ogg => (None, AudioCodec::Vorbis),
        }
    }

    pub fn supports_video(&self, codec: VideoCodec) -> bool {
        match self {
            Self::Mkv => true,
            Self::Mp4 | Self::Mov => matches!(
                codec,
                VideoCodec::H264 | VideoCodec::Hevc | VideoCodec::Mpeg4
            ),
            Self::Webm => codec == VideoCodec::Vp9,
            Self::Avi => matches!(codec, VideoCodec::H264 | VideoCodec::Mpeg4),
            _ => false,
        }
    }

    pub fn supports_audio(&self, codec: AudioCodec) -> bool {
        use AudioCodec::*;
        match self {
            Self::Mkv => true,
            Self::Mp4 => matches!(codec, Aac | Mp3 | Opus | Flac),
            Self::Mov => matches!(codec, Aac | Mp3 | PcmS16le),
            Self::Webm => matches!(codec, Opus | Vorbis),
            Self::Avi => matches!(codec, Mp3 | Aac | PcmS16le),
            Self::Mp3 => codec == Mp3,
            Self::M4a => matches!(codec, Aac | Flac),
            Self::Flac => codec == Flac,
            Self::Wav => codec == PcmS16le,
            Self::Ogg => matches!(codec, Vorbis | Opus | Flac),
        }
    }

    /// Containers that benefit from moving the index to the front.
    pub fn wants_faststart(&self) -> bool {
        matches!(self, Self::Mp4 | Self::Mov | Self::M4a)
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for Container {
    type Err = HenkanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().trim_start_matches('.').to_ascii_lowercase();
        match name.as_str() {
            "mp4" | "m4v" => Ok(Self::Mp4),
            "mkv" | "matroska" => Ok(Self::Mkv),
            "mov" | "quicktime" => Ok(Self::Mov),
            "webm" => Ok(Self::Webm),
            "avi" => Ok(Self::Avi),
            "mp3" => Ok(Self::Mp3),
            "m4a" => Ok(Self::M4a),
            "flac" => Ok(Self::Flac),
            "wav" => Ok(Self::Wav),
            "ogg" | "oga" => Ok(Self::Ogg),
            other => Err(HenkanError::Validation(format!(
                "Unsupported output format '{}'. Valid formats: {}",
                other,
                Container::ALL
                    .iter()
                    .map(|c| c.extension())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }
}
