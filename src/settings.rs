//! Settings inference and the remux decision.
//!
//! [`infer`] turns an analyzed input plus a target container into a complete
//! set of encoder settings, [`SettingsOverride`] layers explicit user
//! requests on top, and [`should_remux`] tells whether the job can be a plain
//! stream copy.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EncodingDefaults;
use crate::error::{HenkanError, Result};
use crate::formats::{AudioCodec, Container, MediaKind, Preset, VideoCodec};
use crate::media::MediaFile;

/// Parameters a job is encoded with.
///
/// `None` codecs mean the output carries no track of that type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub container: Container,
    pub video_codec: Option<VideoCodec>,
    pub audio_codec: Option<AudioCodec>,
    pub quality: Option<u8>,
    pub preset: Option<Preset>,
    pub audio_bitrate: Option<String>,
}

/// Whether the caller accepts the remux recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemuxPolicy {
    #[default]
    Auto,
    Never,
}

/// Explicit requests that win over inferred values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsOverride {
    pub video_codec: Option<VideoCodec>,
    pub audio_codec: Option<AudioCodec>,
    pub quality: Option<u8>,
    pub preset: Option<Preset>,
    pub audio_bitrate: Option<String>,
    pub remux: RemuxPolicy,
}

impl SettingsOverride {
    /// True when no codec parameter is pinned.
    pub fn is_empty(&self) -> bool {
        self.video_codec.is_none()
            && self.audio_codec.is_none()
            && self.quality.is_none()
            && self.preset.is_none()
            && self.audio_bitrate.is_none()
    }
}

/// Propose settings for converting `media` into `target`.
///
/// Codecs come from the container table. The configured codecs only seed a
/// video target that has no table entry; quality, preset and audio bitrate
/// always come from `defaults`.
///
/// Pure: the same input always yields the same settings.
pub fn infer(media: &MediaFile, target: Container, defaults: &EncodingDefaults) -> Settings {
    let (table_video, table_audio) = target.default_codecs();
    let audio_codec = Some(table_audio);
    let video_codec = if target.is_audio_only() || media.kind == MediaKind::Audio {
        // nothing to encode into a video track
        None
    } else {
        table_video.or(Some(defaults.video_codec))
    };

    let preset = video_codec
        .filter(|codec| codec.supports_preset())
        .map(|_| defaults.preset);
    let quality = video_codec.map(|_| defaults.quality);
    let audio_bitrate = audio_codec
        .filter(|codec| !codec.is_lossless())
        .map(|_| defaults.audio_bitrate.clone());

    Settings {
        container: target,
        video_codec,
        audio_codec,
        quality,
        preset,
        audio_bitrate,
    }
}

/// Layer `overrides` on top of inferred `settings`.
///
/// Codec requests the target container cannot hold are refused here, before
/// any job exists.
pub fn apply_override(mut settings: Settings, overrides: &SettingsOverride) -> Result<Settings> {
    let container = settings.container;

    if let Some(video) = overrides.video_codec {
        if !container.supports_video(video) {
            return Err(HenkanError::Validation(format!(
                "Container {} cannot hold {} video",
                container, video
            )));
        }
        settings.video_codec = Some(video);
    }

    if let Some(audio) = overrides.audio_codec {
        if !container.supports_audio(audio) {
            return Err(HenkanError::Validation(format!(
                "Container {} cannot hold {} audio",
                container, audio
            )));
        }
        settings.audio_codec = Some(audio);
    }

    if let Some(quality) = overrides.quality {
        if settings.video_codec.is_some() {
            settings.quality = Some(quality);
        }
    }

    settings.preset = match settings.video_codec {
        Some(codec) if codec.supports_preset() => overrides.preset.or(settings.preset),
        _ => None,
    };

    settings.audio_bitrate = match settings.audio_codec {
        Some(codec) if !codec.is_lossless() => overrides
            .audio_bitrate
            .clone()
            .or(settings.audio_bitrate),
        _ => None,
    };

    debug!("Settings after override: {:?}", settings);
    Ok(settings)
}

/// True when the probed codecs equal the chosen ones.
///
/// Absent equals absent; an unknown probed codec never matches.
pub fn codecs_match(media: &MediaFile, settings: &Settings) -> bool {
    let video_matches = media.video_codec.as_deref() == settings.video_codec.map(|c| c.id());
    let audio_matches = media.audio_codec.as_deref() == settings.audio_codec.map(|c| c.id());
    video_matches && audio_matches
}

/// Recommend a stream copy instead of a re-encode.
///
/// Only video inputs going into a video container qualify, and only when
/// both codecs already match. The answer is advisory.
pub fn should_remux(media: &MediaFile, settings: &Settings) -> bool {
    media.kind == MediaKind::Video
        && settings.container.is_video()
        && media.video_codec.is_some()
        && codecs_match(media, settings)
}
