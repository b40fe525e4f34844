use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Command as StdCommand;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{AnalysisError, HenkanError, Result};
use super::{MediaProbeTrait, ProbeData, StreamInfo, StreamKind};

/// ffprobe's `-print_format json -show_format -show_streams` output
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    disposition: FfprobeDisposition,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeDisposition {
    #[serde(default)]
    attached_pic: u8,
}

// ffprobe prints numbers as strings here
#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: Option<String>,
    duration: Option<String>,
    bit_rate: Option<String>,
    size: Option<String>,
}

/// Parse ffprobe JSON into [`ProbeData`].
pub fn parse_ffprobe_output(json: &str) -> Result<ProbeData> {
    let output: FfprobeOutput = serde_json::from_str(json)?;

    let streams = output
        .streams
        .into_iter()
        .map(|stream| StreamInfo {
            kind: match stream.codec_type.as_deref() {
                Some("video") => StreamKind::Video,
                Some("audio") => StreamKind::Audio,
                Some("subtitle") => StreamKind::Subtitle,
                _ => StreamKind::Other,
            },
            codec: stream.codec_name,
            width: stream.width.unwrap_or(0),
            height: stream.height.unwrap_or(0),
            cover_art: stream.disposition.attached_pic != 0,
        })
        .collect();

    let format = output.format;
    let number = |value: Option<&String>| value.and_then(|v| v.trim().parse::<f64>().ok());

    Ok(ProbeData {
        format_name: format.as_ref().and_then(|f| f.format_name.clone()),
        duration: format.as_ref().and_then(|f| number(f.duration.as_ref())),
        bitrate: format
            .as_ref()
            .and_then(|f| number(f.bit_rate.as_ref()))
            .map(|b| b as u64),
        size: format
            .as_ref()
            .and_then(|f| number(f.size.as_ref()))
            .map(|s| s as u64),
        streams,
    })
}

/// ffprobe-backed prober
pub struct FfprobeProber {
    binary_path: String,
}

impl FfprobeProber {
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }
}

#[async_trait]
impl MediaProbeTrait for FfprobeProber {
    async fn probe(&self, path: &Path) -> Result<ProbeData> {
        debug!("Probing {}", path.display());

        let output = Command::new(&self.binary_path)
            .arg("-v").arg("error")
            .arg("-print_format").arg("json")
            .arg("-show_format")
            .arg("-show_streams")
            .arg(path)
            .output()
            .await
            .map_err(|e| HenkanError::Media(format!("Failed to execute ffprobe: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AnalysisError::Probe(format!(
                "ffprobe rejected {}: {}",
                path.display(),
                stderr.trim()
            ))
            .into());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_ffprobe_output(&stdout)
            .map_err(|e| AnalysisError::Probe(format!("Unreadable ffprobe output: {}", e)).into())
    }

    fn check_availability(&self) -> Result<()> {
        let output = StdCommand::new(&self.binary_path)
            .arg("-version")
            .output()
            .map_err(|e| HenkanError::Media(format!("ffprobe not found: {}", e)))?;

        if output.status.success() {
            info!("ffprobe is available");
            Ok(())
        } else {
            Err(HenkanError::Media("ffprobe version check failed".to_string()))
        }
    }
}
