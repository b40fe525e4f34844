//! The unit of work: one input, one output, one set of settings.
//!
//! A [`ConversionJob`] moves strictly `Pending -> Running -> Completed|Failed`.
//! Only the execution engine that owns the job (`&mut`) drives those
//! transitions; anything else sees the [`JobOutcome`] once it is done.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{HenkanError, Result};
use crate::formats::MediaKind;
use crate::media::MediaFile;
use crate::progress;
use crate::settings::{codecs_match, Settings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional `[start, end)` window on the source timeline, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrimRange {
    pub start: Option<f64>,
    pub end: Option<f64>,
}

impl TrimRange {
    pub fn new(start: Option<f64>, end: Option<f64>) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Output length to request from the encoder, if bounded.
    pub fn length(&self) -> Option<f64> {
        let end = self.end?;
        Some(end - self.start.unwrap_or(0.0))
    }

    /// Check the range against a source duration (0 = unknown).
    pub fn validate(&self, duration: f64) -> Result<()> {
        let known = duration > 0.0;

        if let Some(start) = self.start {
            if !start.is_finite() || start < 0.0 {
                return Err(HenkanError::Validation(format!(
                    "Trim start must be a non-negative number, got {}",
                    start
                )));
            }
            if known && start >= duration {
                return Err(HenkanError::Validation(format!(
                    "Trim start {}s is beyond the source duration {:.3}s",
                    start, duration
                )));
            }
        }

        if let Some(end) = self.end {
            if !end.is_finite() || end <= 0.0 {
                return Err(HenkanError::Validation(format!(
                    "Trim end must be a positive number, got {}",
                    end
                )));
            }
            if known && end > duration {
                return Err(HenkanError::Validation(format!(
                    "Trim end {}s is beyond the source duration {:.3}s",
                    end, duration
                )));
            }
        }

        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start >= end {
                return Err(HenkanError::Validation(format!(
                    "Trim start {}s must be before trim end {}s",
                    start, end
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub id: String,
    pub input: MediaFile,
    pub output_path: PathBuf,
    pub settings: Settings,
    pub trim: TrimRange,
    pub remux_only: bool,
    status: JobStatus,
    progress: f64,
    error: Option<String>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl ConversionJob {
    /// Validate and create a pending job.
    pub fn new(
        input: MediaFile,
        output_path: PathBuf,
        settings: Settings,
        trim: TrimRange,
        remux_only: bool,
    ) -> Result<Self> {
        if input.kind == MediaKind::Subtitle {
            return Err(HenkanError::Validation(format!(
                "{} is a subtitle file and cannot be converted",
                input.path
            )));
        }

        if output_path.file_name().is_none() {
            return Err(HenkanError::Validation(format!(
                "Invalid output path: {}",
                output_path.display()
            )));
        }

        if same_file(Path::new(&input.path), &output_path) {
            return Err(HenkanError::Validation(format!(
                "Output path must differ from the input: {}",
                output_path.display()
            )));
        }

        trim.validate(input.duration)?;

        if remux_only && !codecs_match(&input, &settings) {
            return Err(HenkanError::Validation(format!(
                "Cannot remux {}: codecs {:?}/{:?} differ from {:?}/{:?}",
                input.path,
                input.video_codec,
                input.audio_codec,
                settings.video_codec.map(|c| c.id()),
                settings.audio_codec.map(|c| c.id()),
            )));
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            input,
            output_path,
            settings,
            trim,
            remux_only,
            status: JobStatus::Pending,
            progress: 0.0,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        })
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn transition(&mut self, to: JobStatus) -> Result<()> {
        let allowed = matches!(
            (self.status, to),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
        );
        if !allowed {
            return Err(HenkanError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    pub fn start(&mut self) -> Result<()> {
        self.transition(JobStatus::Running)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Record progress while running.
    ///
    /// Values are clamped to [0, 100] and never move backwards. Returns the
    /// progress now stored.
    pub fn update_progress(&mut self, percentage: f64) -> f64 {
        if self.status == JobStatus::Running && percentage.is_finite() {
            self.progress = self.progress.max(percentage.clamp(0.0, 100.0));
        }
        self.progress
    }

    pub fn complete(&mut self) -> Result<()> {
        self.transition(JobStatus::Completed)?;
        self.progress = 100.0;
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    pub fn fail<S: Into<String>>(&mut self, message: S) -> Result<()> {
        self.transition(JobStatus::Failed)?;
        self.error = Some(message.into());
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Seconds of output the progress percentage is measured against.
    pub fn progress_total_seconds(&self) -> f64 {
        progress::effective_duration(self.input.duration, &self.trim)
    }

    /// Wall-clock time between start and finish (or now).
    pub fn elapsed_secs(&self) -> f64 {
        match self.started_at {
            Some(started) => {
                let end = self.finished_at.unwrap_or_else(Utc::now);
                (end - started).num_milliseconds().max(0) as f64 / 1000.0
            }
            None => 0.0,
        }
    }

    pub fn outcome(&self) -> JobOutcome {
        JobOutcome {
            id: self.id.clone(),
            input: self.input.path.clone(),
            output: self.output_path.to_string_lossy().to_string(),
            settings: self.settings.clone(),
            remux_only: self.remux_only,
            status: self.status,
            error: self.error.clone(),
            elapsed_secs: self.elapsed_secs(),
        }
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// What is reported about a job once it has reached a terminal status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub id: String,
    pub input: String,
    pub output: String,
    pub settings: Settings,
    pub remux_only: bool,
    pub status: JobStatus,
    pub error: Option<String>,
    pub elapsed_secs: f64,
}
