use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{HenkanError, Result};
use crate::formats::{AudioCodec, Preset, VideoCodec};
use crate::job::JobOutcome;

/// File name looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "henkan.toml";

fn default_max_recent() -> usize {
    10
}

fn default_remember_settings() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub encoding: EncodingDefaults,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub recent: RecentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathsConfig {
    /// Directory scanned by `batch` when no input is given
    pub input_dir: Option<PathBuf>,
    /// Where converted files go when no output directory is given
    pub output_dir: Option<PathBuf>,
}

/// Defaults the settings inference starts from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingDefaults {
    pub video_codec: VideoCodec,
    pub audio_codec: AudioCodec,
    /// CRF-style quality (lower = better, 23 is the x264 default)
    pub quality: u8,
    /// Bitrate for lossy audio codecs, e.g. "192k"
    pub audio_bitrate: String,
    /// Encoding speed (ultrafast, fast, medium, slow, veryslow)
    pub preset: Preset,
}

impl Default for EncodingDefaults {
    fn default() -> Self {
        Self {
            video_codec: VideoCodec::H264,
            audio_codec: AudioCodec::Aac,
            quality: 23,
            audio_bitrate: "192k".to_string(),
            preset: Preset::Medium,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub ffmpeg_path: String,
    /// Path to ffprobe binary
    pub ffprobe_path: String,
    /// Additional encoder options inserted before the output path
    /// e.g. ["-pix_fmt", "yuv420p"]
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            extra_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentConfig {
    /// Recently converted inputs, most recent first
    #[serde(default)]
    pub files: Vec<String>,
    /// Recently written outputs, most recent first
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default = "default_max_recent")]
    pub max_recent: usize,
    /// Write the settings of successful jobs back as new defaults
    #[serde(default = "default_remember_settings")]
    pub remember_settings: bool,
}

impl Default for RecentConfig {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            outputs: Vec::new(),
            max_recent: default_max_recent(),
            remember_settings: default_remember_settings(),
        }
    }
}

impl RecentConfig {
    pub fn clear(&mut self) {
        self.files.clear();
        self.outputs.clear();
    }
}

/// Insert at the front, dropping duplicates and anything past `cap`.
fn push_recent(list: &mut Vec<String>, entry: String, cap: usize) {
    list.retain(|existing| existing != &entry);
    list.insert(0, entry);
    list.truncate(cap);
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| HenkanError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| HenkanError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            debug!("Loading configuration from {}", path.display());
            Self::from_file(path)
        } else {
            debug!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| HenkanError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| HenkanError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Record a finished job: recent lists always, encoding defaults only
    /// when `remember_settings` is on and the job actually re-encoded.
    pub fn remember(&mut self, outcome: &JobOutcome) {
        let cap = self.recent.max_recent;
        push_recent(&mut self.recent.files, outcome.input.clone(), cap);
        push_recent(&mut self.recent.outputs, outcome.output.clone(), cap);

        if !self.recent.remember_settings || outcome.remux_only {
            return;
        }

        let settings = &outcome.settings;
        if let Some(video) = settings.video_codec {
            self.encoding.video_codec = video;
        }
        // audio-only targets pick their codec from the container, not the user
        if !settings.container.is_audio_only() {
            if let Some(audio) = settings.audio_codec {
                self.encoding.audio_codec = audio;
            }
        }
        if let Some(quality) = settings.quality {
            self.encoding.quality = quality;
        }
        if let Some(preset) = settings.preset {
            self.encoding.preset = preset;
        }
        if let Some(bitrate) = &settings.audio_bitrate {
            self.encoding.audio_bitrate = bitrate.clone();
        }
        if let Some(parent) = Path::new(&outcome.output).parent() {
            if !parent.as_os_str().is_empty() {
                self.paths.output_dir = Some(parent.to_path_buf());
            }
        }
    }
}
