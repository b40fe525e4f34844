use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::cancel::CancelSignal;
use crate::config::Config;
use crate::engine::ExecutionEngine;
use crate::error::{FailureReason, HenkanError, Result};
use crate::formats::{Container, MediaKind};
use crate::job::{ConversionJob, JobOutcome, TrimRange};
use crate::media::{AnalysisReport, MediaAnalyzer, MediaProbeFactory, MediaProbeTrait};
use crate::output::{default_output_path, resolve_default_output, resolve_output, OutputPolicy};
use crate::progress::{ProgressSnapshot, ProgressTicker};
use crate::settings::{apply_override, infer, should_remux, RemuxPolicy, SettingsOverride};

/// Options shared by every file of a batch.
#[derive(Debug, Clone)]
pub struct ConversionOptions {
    pub target: Container,
    pub overrides: SettingsOverride,
    pub output_dir: Option<PathBuf>,
    pub policy: OutputPolicy,
    /// Recreate each input's sub-directory (relative to this root) under
    /// the output directory
    pub mirror_root: Option<PathBuf>,
}

impl ConversionOptions {
    pub fn new(target: Container) -> Self {
        Self {
            target,
            overrides: SettingsOverride::default(),
            output_dir: None,
            policy: OutputPolicy::default(),
            mirror_root: None,
        }
    }
}

/// A single conversion: batch options plus per-file trim and output.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub options: ConversionOptions,
    pub trim: TrimRange,
    pub output: Option<PathBuf>,
}

impl From<ConversionOptions> for ConversionRequest {
    fn from(options: ConversionOptions) -> Self {
        Self {
            options,
            trim: TrimRange::default(),
            output: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchFailure {
    pub path: PathBuf,
    pub reason: FailureReason,
    pub message: String,
}

/// Per-file results of a batch, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<JobOutcome>,
    pub failures: Vec<BatchFailure>,
    /// Never started because the batch was cancelled
    pub skipped: Vec<PathBuf>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn total(&self) -> usize {
        self.succeeded() + self.failed() + self.skipped.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.skipped.is_empty()
    }
}

pub struct Workflow {
    config: Config,
    analyzer: MediaAnalyzer,
    engine: ExecutionEngine,
    show_progress: bool,
}

impl Workflow {
    /// Build a workflow on the configured tools.
    ///
    /// The encoder must run. A missing probe tool only degrades analysis.
    pub async fn new(config: Config) -> Result<Self> {
        let prober = MediaProbeFactory::create_prober(&config.media);
        if let Err(e) = prober.check_availability() {
            warn!("{}; inputs will be converted without analysis", e);
        }

        let workflow = Self::with_prober(config, prober);
        workflow
            .engine
            .commands()
            .version_check()
            .execute()
            .await?;
        info!("{} is available", workflow.engine.commands().binary_path());

        Ok(workflow)
    }

    pub fn with_prober(config: Config, prober: Box<dyn MediaProbeTrait>) -> Self {
        let engine = ExecutionEngine::new(&config.media);
        Self {
            config,
            analyzer: MediaAnalyzer::new(prober),
            engine,
            show_progress: false,
        }
    }

    /// Draw a progress bar while jobs run
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub async fn analyze<P: AsRef<Path>>(&self, path: P) -> AnalysisReport {
        self.analyzer.analyze(path).await
    }

    /// Turn an analysis into a validated job.
    pub fn plan(&self, report: &AnalysisReport, request: &ConversionRequest) -> Result<ConversionJob> {
        if !report.is_usable() {
            if let Some(issue) = &report.issue {
                return Err(HenkanError::Analysis(issue.clone()));
            }
        }

        let media = &report.media;
        let options = &request.options;
        let input = media.path_buf();

        let inferred = infer(media, options.target, &self.config.encoding);
        let settings = apply_override(inferred, &options.overrides)?;
        let remux = options.overrides.remux == RemuxPolicy::Auto && should_remux(media, &settings);
        debug!("Planned {} with {:?} (remux: {})", media.path, settings, remux);

        let output = match &request.output {
            Some(path) => resolve_output(&input, path.clone(), options.policy)?,
            None => {
                let dir = self.output_dir_for(&input, options);
                let derived = default_output_path(&input, options.target, dir.as_deref())?;
                resolve_default_output(&input, derived, options.policy)?
            }
        };

        ConversionJob::new(media.clone(), output, settings, request.trim, remux)
    }

    fn output_dir_for(&self, input: &Path, options: &ConversionOptions) -> Option<PathBuf> {
        let base = options
            .output_dir
            .clone()
            .or_else(|| self.config.paths.output_dir.clone())?;

        let relative = options
            .mirror_root
            .as_deref()
            .zip(input.parent())
            .and_then(|(root, parent)| pathdiff::diff_paths(parent, root))
            .filter(|rel| !rel.as_os_str().is_empty() && !rel.starts_with(".."));

        Some(match relative {
            Some(rel) => base.join(rel),
            None => base,
        })
    }

    /// Analyze, plan and run one file.
    ///
    /// Probe problems do not stop the job; a missing input does.
    pub async fn convert_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        request: &ConversionRequest,
        cancel: &mut CancelSignal,
    ) -> Result<JobOutcome> {
        let path = path.as_ref();
        info!("Converting {} to {}", path.display(), request.options.target);

        let report = self.analyze(path).await;
        if let Some(issue) = &report.issue {
            warn!("Analysis of {} incomplete: {}", path.display(), issue);
        }

        let mut job = self.plan(&report, request)?;
        self.run_job(&mut job, cancel).await?;
        Ok(job.outcome())
    }

    async fn run_job(&mut self, job: &mut ConversionJob, cancel: &mut CancelSignal) -> Result<()> {
        if !self.show_progress {
            return self.engine.execute(job, None, cancel).await;
        }

        let label = job
            .input
            .path_buf()
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| job.input.path.clone());
        let (sender, receiver) = watch::channel(ProgressSnapshot::default());
        let ticker = ProgressTicker::spawn(&label, receiver);

        let result = self.engine.execute(job, Some(&sender), cancel).await;
        drop(sender);
        ticker.finish().await;
        result
    }

    /// Convert every file in order, recording failures instead of raising.
    pub async fn run_batch(
        &mut self,
        files: &[PathBuf],
        options: &ConversionOptions,
        cancel: &mut CancelSignal,
    ) -> BatchReport {
        info!("Starting batch of {} files", files.len());
        let mut report = BatchReport::default();
        let request = ConversionRequest::from(options.clone());

        for (index, file) in files.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!("Batch cancelled, skipping {} remaining files", files.len() - index);
                report.skipped.extend(files[index..].iter().cloned());
                break;
            }

            info!("[{}/{}] {}", index + 1, files.len(), file.display());
            match self.convert_file(file, &request, cancel).await {
                Ok(outcome) => {
                    info!("Successfully converted: {}", file.display());
                    report.outcomes.push(outcome);
                }
                Err(e) => {
                    warn!("Failed to convert {}: {}", file.display(), e);
                    report.failures.push(BatchFailure {
                        path: file.clone(),
                        reason: FailureReason::from(&e),
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Batch finished: {} succeeded, {} failed, {} skipped",
            report.succeeded(),
            report.failed(),
            report.skipped.len()
        );
        report
    }
}

/// Convertible media files under `dir`, sorted by path.
pub fn collect_media_files<P: AsRef<Path>>(dir: P, recursive: bool) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(HenkanError::Validation(format!(
            "Input path is not a directory: {}",
            dir.display()
        )));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| MediaKind::from_path(path).is_convertible())
        .collect();
    files.sort();

    info!("Found {} media files in {}", files.len(), dir.display());
    Ok(files)
}
