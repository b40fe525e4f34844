use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::config::MediaConfig;
use crate::error::{HenkanError, Result};
use crate::formats::Container;
use crate::job::ConversionJob;

/// Abstract media processing command representation
#[derive(Debug, Clone, PartialEq)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Only report errors on stderr
    pub fn quiet(self) -> Self {
        self.arg("-hide_banner").arg("-loglevel").arg("error")
    }

    /// Machine-readable progress on stdout instead of the stats line
    pub fn progress_to_stdout(self) -> Self {
        self.arg("-progress").arg("pipe:1").arg("-nostats")
    }

    /// Seek the input before decoding
    pub fn seek(self, seconds: f64) -> Self {
        self.arg("-ss").arg(format_seconds(seconds))
    }

    /// Limit output duration
    pub fn duration(self, seconds: f64) -> Self {
        self.arg("-t").arg(format_seconds(seconds))
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Copy video stream
    pub fn copy_video(self) -> Self {
        self.video_codec("copy")
    }

    /// Copy audio stream
    pub fn copy_audio(self) -> Self {
        self.audio_codec("copy")
    }

    /// Disable video
    pub fn no_video(self) -> Self {
        self.arg("-vn")
    }

    /// Disable audio
    pub fn no_audio(self) -> Self {
        self.arg("-an")
    }

    /// Disable subtitles
    pub fn no_subtitles(self) -> Self {
        self.arg("-sn")
    }

    /// Copy subtitle streams as they are
    pub fn copy_subtitles(self) -> Self {
        self.arg("-c:s").arg("copy")
    }

    /// Set audio bitrate
    pub fn audio_bitrate<S: Into<String>>(self, bitrate: S) -> Self {
        self.arg("-b:a").arg(bitrate)
    }

    /// Set encoder preset
    pub fn preset<S: Into<String>>(self, preset: S) -> Self {
        self.arg("-preset").arg(preset)
    }

    /// Move the index to the front of the file
    pub fn faststart(self) -> Self {
        self.arg("-movflags").arg("+faststart")
    }

    /// Build a tokio command with piped stdout/stderr
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.binary_path);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Execute the command to completion, returning stdout
    pub async fn execute(&self) -> Result<String> {
        debug!("Executing media command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let output = self
            .to_command()
            .output()
            .await
            .map_err(|e| HenkanError::Media(format!("Failed to execute {}: {}", self.binary_path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HenkanError::Media(format!(
                "{} failed: {}",
                self.description,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// ffmpeg accepts plain seconds with a fractional part
fn format_seconds(seconds: f64) -> String {
    let formatted = format!("{:.3}", seconds.max(0.0));
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Builder for encoder invocations
pub struct EncoderCommandBuilder {
    binary_path: String,
    extra_args: Vec<String>,
}

impl EncoderCommandBuilder {
    /// Create a new command builder
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            binary_path: config.ffmpeg_path.clone(),
            extra_args: config.extra_args.clone(),
        }
    }

    pub fn binary_path(&self) -> &str {
        &self.binary_path
    }

    /// Build the full conversion command for a job.
    ///
    /// Remux jobs copy both streams; everything else gets explicit codec,
    /// quality, preset and bitrate flags, or `-vn`/`-an` for absent tracks.
    pub fn conversion(&self, job: &ConversionJob) -> MediaCommand {
        let settings = &job.settings;
        let description = if job.remux_only {
            format!("Remux to {}", settings.container)
        } else {
            format!("Convert to {}", settings.container)
        };

        let mut cmd = MediaCommand::new(&self.binary_path, description)
            .quiet()
            .progress_to_stdout()
            .overwrite();

        if let Some(start) = job.trim.start {
            cmd = cmd.seek(start);
        }
        cmd = cmd.input(&job.input.path);
        if let Some(length) = job.trim.length() {
            cmd = cmd.duration(length);
        }

        // mkv keeps subtitles; bitmap formats cannot be converted to its default ass
        cmd = if settings.container == Container::Mkv {
            cmd.copy_subtitles()
        } else {
            cmd.no_subtitles()
        };

        if job.remux_only {
            cmd = cmd.copy_video().copy_audio();
        } else {
            cmd = match settings.video_codec {
                Some(codec) => {
                    let mut cmd = cmd.video_codec(codec.encoder());
                    if let Some(quality) = settings.quality {
                        cmd = cmd.args(codec.quality_args(quality));
                    }
                    match settings.preset {
                        Some(preset) if codec.supports_preset() => cmd.preset(preset.as_str()),
                        _ => cmd,
                    }
                }
                None => cmd.no_video(),
            };

            cmd = match settings.audio_codec {
                Some(codec) => {
                    let cmd = cmd.audio_codec(codec.encoder());
                    match &settings.audio_bitrate {
                        Some(bitrate) if !codec.is_lossless() => cmd.audio_bitrate(bitrate.as_str()),
                        _ => cmd,
                    }
                }
                None => cmd.no_audio(),
            };

            if settings.container.wants_faststart() {
                cmd = cmd.faststart();
            }
        }

        cmd.args(self.extra_args.iter().cloned())
            .output(&job.output_path)
    }

    /// Build version check command
    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Version check").arg("-version")
    }
}
