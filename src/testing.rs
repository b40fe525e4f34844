//! Shared fixtures for unit tests: media values and stand-in encoder scripts.

use std::path::{Path, PathBuf};

use crate::config::MediaConfig;
use crate::formats::MediaKind;
use crate::media::{MediaFile, ProbeData, StreamInfo, StreamKind};

/// Reports progress up to 60s of output and writes the last argument.
pub const ENCODER_OK: &str = r#"#!/bin/sh
for last; do :; done
echo "out_time=00:00:15.000000"
echo "progress=continue"
echo "out_time=00:00:30.000000"
echo "progress=continue"
echo "out_time=00:01:00.000000"
echo "progress=end"
printf 'encoded' > "$last"
"#;

pub const ENCODER_FAIL: &str = r#"#!/bin/sh
echo "out_time=00:00:01.000000"
echo "Invalid data found when processing input" >&2
exit 1
"#;

pub const ENCODER_SILENT_FAIL: &str = "#!/bin/sh\nexit 3\n";

pub const ENCODER_HANG: &str = r#"#!/bin/sh
echo "out_time=00:00:01.000000"
exec sleep 30
"#;

/// Fails for any input whose name contains `corrupt`, otherwise behaves like
/// [`ENCODER_OK`].
pub const ENCODER_PICKY: &str = r#"#!/bin/sh
for arg; do
  case "$arg" in
    *corrupt*) echo "moov atom not found" >&2; exit 1 ;;
  esac
done
for last; do :; done
echo "out_time=00:00:30.000000"
printf 'encoded' > "$last"
"#;

/// Write an executable script into `dir`.
#[cfg(unix)]
pub fn fake_encoder(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

pub fn media_config(ffmpeg: &Path) -> MediaConfig {
    MediaConfig {
        ffmpeg_path: ffmpeg.to_string_lossy().to_string(),
        ..MediaConfig::default()
    }
}

pub fn video_file(path: &Path, duration: f64) -> MediaFile {
    MediaFile {
        path: path.to_string_lossy().to_string(),
        kind: MediaKind::Video,
        container: "mp4".to_string(),
        video_codec: Some("h264".to_string()),
        audio_codec: Some("aac".to_string()),
        duration,
        width: 1280,
        height: 720,
        bitrate: 0,
        size: 1024,
    }
}

/// What ffprobe reports for an h264/aac file.
pub fn h264_aac_probe(duration: Option<f64>) -> ProbeData {
    ProbeData {
        format_name: Some("mov,mp4,m4a,3gp,3g2,mj2".to_string()),
        duration,
        bitrate: Some(1_000_000),
        size: None,
        streams: vec![
            StreamInfo {
                kind: StreamKind::Video,
                codec: Some("h264".to_string()),
                width: 1280,
                height: 720,
                cover_art: false,
            },
            StreamInfo {
                kind: StreamKind::Audio,
                codec: Some("aac".to_string()),
                width: 0,
                height: 0,
                cover_art: false,
            },
        ],
    }
}
