//! Runs one conversion job through the external encoder.

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::cancel::CancelSignal;
use crate::config::MediaConfig;
use crate::error::{HenkanError, Result};
use crate::job::ConversionJob;
use crate::media::EncoderCommandBuilder;
use crate::progress::{FfmpegProgressParser, ProgressParser, ProgressSnapshot, ProgressTracker};

/// Lines of encoder diagnostics kept in a failure message
const STDERR_TAIL_LINES: usize = 10;

pub struct ExecutionEngine {
    commands: EncoderCommandBuilder,
    parser: Box<dyn ProgressParser>,
    tracker: ProgressTracker,
}

impl ExecutionEngine {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            commands: EncoderCommandBuilder::new(config),
            parser: Box::new(FfmpegProgressParser),
            tracker: ProgressTracker::new(),
        }
    }

    pub fn with_parser(mut self, parser: Box<dyn ProgressParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn commands(&self) -> &EncoderCommandBuilder {
        &self.commands
    }

    /// Drive `job` from pending to a terminal status.
    ///
    /// On error the job has already been marked failed with the error's
    /// message. Snapshots are published on `progress` when given.
    pub async fn execute(
        &mut self,
        job: &mut ConversionJob,
        progress: Option<&watch::Sender<ProgressSnapshot>>,
        cancel: &mut CancelSignal,
    ) -> Result<()> {
        job.start()?;
        debug!("Job {} created at {} started", job.id, job.created_at());
        let result = self.run(job, progress, cancel).await;
        self.tracker.finish(&job.id);

        match result {
            Ok(()) => {
                job.complete()?;
                if let Some(sender) = progress {
                    sender.send_modify(|snapshot| {
                        snapshot.percentage = 100.0;
                        snapshot.eta = Some(std::time::Duration::ZERO);
                    });
                }
                info!(
                    "Job {} completed: {} -> {}",
                    job.id,
                    job.input.path,
                    job.output_path.display()
                );
                Ok(())
            }
            Err(e) => {
                error!("Job {} failed: {}", job.id, e);
                job.fail(e.to_string())?;
                Err(e)
            }
        }
    }

    async fn run(
        &mut self,
        job: &mut ConversionJob,
        progress: Option<&watch::Sender<ProgressSnapshot>>,
        cancel: &mut CancelSignal,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(HenkanError::Cancelled(format!(
                "{} was not started",
                job.input.path
            )));
        }

        let command = self.commands.conversion(job);
        info!("{}: {}", command.description, job.input.path);
        debug!("Executing media command: {} {:?}", command.binary_path, command.args);

        let mut child = command.to_command().spawn().map_err(|e| {
            HenkanError::Media(format!("Failed to execute {}: {}", command.binary_path, e))
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| HenkanError::Media("Encoder stdout was not captured".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| HenkanError::Media("Encoder stderr was not captured".to_string()))?;

        let stderr_task = tokio::spawn(async move {
            let mut buffer = String::new();
            let _ = stderr.read_to_string(&mut buffer).await;
            buffer
        });

        let total = job.progress_total_seconds();
        // the clock runs from the spawn, not from the first progress line
        let started = self.tracker.update(&job.id, 0.0, total);
        if let Some(sender) = progress {
            sender.send_replace(started);
        }
        let mut lines = BufReader::new(stdout).lines();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    warn!("Cancelling job {}", job.id);
                    if let Err(e) = child.kill().await {
                        warn!("Failed to kill encoder: {}", e);
                    }
                    stderr_task.abort();
                    return Err(HenkanError::Cancelled(format!(
                        "{} interrupted at {:.1}%",
                        job.input.path,
                        job.progress()
                    )));
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        let Some(elapsed) = self.parser.parse_line(&line) else {
                            continue;
                        };
                        let snapshot = self.tracker.update(&job.id, elapsed.as_secs_f64(), total);
                        let percentage = job.update_progress(snapshot.percentage);
                        debug!("Job {} progress {:.1}%", job.id, percentage);
                        if let Some(sender) = progress {
                            sender.send_replace(ProgressSnapshot { percentage, ..snapshot });
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Stopped reading encoder progress: {}", e);
                        break;
                    }
                }
            }
        }

        let status = tokio::select! {
            _ = cancel.cancelled() => {
                let _ = child.kill().await;
                stderr_task.abort();
                return Err(HenkanError::Cancelled(format!("{} interrupted", job.input.path)));
            }
            status = child.wait() => status?,
        };
        let diagnostics = stderr_task.await.unwrap_or_default();

        if status.success() {
            return Ok(());
        }

        let message = stderr_tail(&diagnostics)
            .unwrap_or_else(|| format!("{} exited with {}", command.binary_path, status));
        Err(HenkanError::Encoding(message))
    }
}

fn stderr_tail(diagnostics: &str) -> Option<String> {
    let lines: Vec<&str> = diagnostics
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        return None;
    }
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    Some(lines[start..].join("\n"))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::cancel::cancel_pair;
    use crate::config::EncodingDefaults;
    use crate::formats::Container;
    use crate::job::{JobStatus, TrimRange};
    use crate::settings::{infer, should_remux};
    use crate::testing::*;
    use std::path::Path;
    use std::time::Duration;

    fn job_for(dir: &Path, duration: f64, target: Container) -> ConversionJob {
        let input = dir.join("clip.mp4");
        std::fs::write(&input, b"input").unwrap();
        let media = video_file(&input, duration);
        let settings = infer(&media, target, &EncodingDefaults::default());
        let remux = should_remux(&media, &settings);
        ConversionJob::new(
            media,
            dir.join(format!("out.{}", target.extension())),
            settings,
            TrimRange::default(),
            remux,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_successful_run_completes_at_100() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = fake_encoder(dir.path(), "ffmpeg", ENCODER_OK);
        let mut engine = ExecutionEngine::new(&media_config(&encoder));
        let mut job = job_for(dir.path(), 60.0, Container::Mkv);
        let (tx, rx) = watch::channel(ProgressSnapshot::default());

        engine
            .execute(&mut job, Some(&tx), &mut CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(job.status(), JobStatus::Completed);
        assert_eq!(job.progress(), 100.0);
        assert_eq!(rx.borrow().percentage, 100.0);
        assert_eq!(std::fs::read_to_string(&job.output_path).unwrap(), "encoded");
    }

    #[tokio::test]
    async fn test_progress_is_measured_against_trimmed_length() {
        let dir = tempfile::tempdir().unwrap();
        // 5s of a 10s window, then the script fails
        let encoder = fake_encoder(
            dir.path(),
            "ffmpeg",
            "#!/bin/sh\necho out_time=00:00:05.000000\nexit 1\n",
        );
        let mut engine = ExecutionEngine::new(&media_config(&encoder));
        let mut job = job_for(dir.path(), 30.0, Container::Mkv);
        job.trim = TrimRange::new(Some(10.0), Some(20.0));

        let result = engine.execute(&mut job, None, &mut CancelSignal::never()).await;
        assert!(result.is_err());
        assert_eq!(job.progress(), 50.0);
    }

    #[tokio::test]
    async fn test_unknown_duration_uses_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = fake_encoder(
            dir.path(),
            "ffmpeg",
            "#!/bin/sh\necho out_time=00:00:30.000000\nexit 1\n",
        );
        let mut engine = ExecutionEngine::new(&media_config(&encoder));
        let mut job = job_for(dir.path(), 0.0, Container::Mkv);

        let _ = engine.execute(&mut job, None, &mut CancelSignal::never()).await;
        // 30s against the 60s fallback
        assert_eq!(job.progress(), 50.0);
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_an_encoding_error() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = fake_encoder(dir.path(), "ffmpeg", ENCODER_FAIL);
        let mut engine = ExecutionEngine::new(&media_config(&encoder));
        let mut job = job_for(dir.path(), 60.0, Container::Mp4);

        let result = engine.execute(&mut job, None, &mut CancelSignal::never()).await;
        assert!(matches!(&result, Err(HenkanError::Encoding(msg)) if msg.contains("Invalid data")));
        assert_eq!(job.status(), JobStatus::Failed);
        assert!(job.error().unwrap().contains("Invalid data"));
        assert!(job.progress() < 100.0);
    }

    #[tokio::test]
    async fn test_empty_stderr_reports_exit_status() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = fake_encoder(dir.path(), "ffmpeg", ENCODER_SILENT_FAIL);
        let mut engine = ExecutionEngine::new(&media_config(&encoder));
        let mut job = job_for(dir.path(), 60.0, Container::Mp4);

        let result = engine.execute(&mut job, None, &mut CancelSignal::never()).await;
        assert!(matches!(&result, Err(HenkanError::Encoding(msg)) if msg.contains("exited with")));
    }

    #[tokio::test]
    async fn test_missing_encoder_is_a_media_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = ExecutionEngine::new(&media_config(Path::new("/nonexistent/henkan-ffmpeg")));
        let mut job = job_for(dir.path(), 60.0, Container::Mp4);

        let result = engine.execute(&mut job, None, &mut CancelSignal::never()).await;
        assert!(matches!(result, Err(HenkanError::Media(_))));
        assert_eq!(job.status(), JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_cancellation_kills_the_encoder() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = fake_encoder(dir.path(), "ffmpeg", ENCODER_HANG);
        let mut engine = ExecutionEngine::new(&media_config(&encoder));
        let mut job = job_for(dir.path(), 60.0, Container::Mkv);
        let (handle, mut signal) = cancel_pair();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            handle.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(10),
            engine.execute(&mut job, None, &mut signal),
        )
        .await
        .expect("engine did not react to cancellation");

        assert!(matches!(result, Err(HenkanError::Cancelled(_))));
        assert_eq!(job.status(), JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_already_cancelled_job_never_spawns() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = ExecutionEngine::new(&media_config(Path::new("/nonexistent/henkan-ffmpeg")));
        let mut job = job_for(dir.path(), 60.0, Container::Mkv);
        let (handle, mut signal) = cancel_pair();
        handle.cancel();

        let result = engine.execute(&mut job, None, &mut signal).await;
        assert!(matches!(result, Err(HenkanError::Cancelled(_))));
    }

    #[tokio::test]
    async fn test_eta_counts_time_before_first_progress_line() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = fake_encoder(
            dir.path(),
            "ffmpeg",
            "#!/bin/sh\nsleep 1\necho out_time=00:00:06.000000\nsleep 1\necho out_time=00:00:12.000000\nexit 1\n",
        );
        let mut engine = ExecutionEngine::new(&media_config(&encoder));
        let mut job = job_for(dir.path(), 60.0, Container::Mkv);
        let (tx, rx) = watch::channel(ProgressSnapshot::default());

        let _ = engine
            .execute(&mut job, Some(&tx), &mut CancelSignal::never())
            .await;

        let snapshot = *rx.borrow();
        assert_eq!(snapshot.percentage, 20.0);
        assert!(snapshot.elapsed >= Duration::from_millis(1900));
        // about 2s for 20%, so roughly 8s left
        let eta = snapshot.eta.unwrap();
        assert!(eta >= Duration::from_secs(7), "eta too low: {:?}", eta);
    }

    struct PlainSecondsParser;

    impl ProgressParser for PlainSecondsParser {
        fn parse_line(&self, line: &str) -> Option<Duration> {
            let secs: f64 = line.strip_prefix("secs=")?.trim().parse().ok()?;
            Some(Duration::from_secs_f64(secs))
        }
    }

    #[tokio::test]
    async fn test_parser_is_swappable() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = fake_encoder(
            dir.path(),
            "ffmpeg",
            "#!/bin/sh\necho secs=45\necho out_time=00:00:59.000000\nexit 1\n",
        );
        let mut engine =
            ExecutionEngine::new(&media_config(&encoder)).with_parser(Box::new(PlainSecondsParser));
        let mut job = job_for(dir.path(), 60.0, Container::Mkv);

        let _ = engine.execute(&mut job, None, &mut CancelSignal::never()).await;
        assert_eq!(job.progress(), 75.0);
    }

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let text: String = (0..15).map(|i| format!("line {}\n", i)).collect();
        let tail = stderr_tail(&text).unwrap();
        assert!(tail.starts_with("line 5"));
        assert!(tail.ends_with("line 14"));
        assert_eq!(stderr_tail("  \n\n"), None);
    }
}
