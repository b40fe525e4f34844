//! henkan - media conversion pipeline
//!
//! Entry point for the command line tool: converts single files or whole
//! batches through ffmpeg, choosing between remux and re-encode.

use anyhow::{Result, bail};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::{non_blocking, rolling};

use henkan::cancel::cancel_pair;
use henkan::cli::{Args, Commands, ConfigAction, EncodeArgs};
use henkan::config::{Config, DEFAULT_CONFIG_FILE};
use henkan::error::HenkanError;
use henkan::formats::{AudioCodec, Container, Preset, VideoCodec};
use henkan::job::{JobOutcome, TrimRange};
use henkan::media::{MediaAnalyzer, MediaProbeFactory};
use henkan::output::OutputPolicy;
use henkan::settings::{RemuxPolicy, SettingsOverride};
use henkan::workflow::{collect_media_files, BatchReport, ConversionOptions, ConversionRequest, Workflow};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let mut config = Config::load_or_default(&config_path)?;

    match args.command {
        Commands::Convert { input, output, start, end, encode } => {
            info!("Converting file: {}", input.display());

            let request = ConversionRequest {
                options: build_options(&encode)?,
                trim: TrimRange::new(start, end),
                output,
            };

            let (handle, mut cancel) = cancel_pair();
            handle.cancel_on_ctrl_c();

            let mut workflow = Workflow::new(config.clone()).await?.show_progress(!encode.quiet);
            let outcome = workflow.convert_file(&input, &request, &mut cancel).await?;
            print_outcome(&outcome);

            remember(&mut config, &config_path, std::slice::from_ref(&outcome));
        }
        Commands::Batch { input_dir, files, recursive, encode } => {
            let mut options = build_options(&encode)?;

            let files = if !files.is_empty() {
                files
            } else {
                let dir = input_dir
                    .or_else(|| config.paths.input_dir.clone())
                    .ok_or_else(|| {
                        HenkanError::Config("No input directory given or configured".to_string())
                    })?;
                info!("Processing directory: {}", dir.display());
                if recursive {
                    options.mirror_root = Some(dir.clone());
                }
                collect_media_files(&dir, recursive)?
            };

            let (handle, mut cancel) = cancel_pair();
            handle.cancel_on_ctrl_c();

            let mut workflow = Workflow::new(config.clone()).await?.show_progress(!encode.quiet);
            let report = workflow.run_batch(&files, &options, &mut cancel).await;
            print_batch_report(&report);

            remember(&mut config, &config_path, &report.outcomes);

            if !report.is_success() {
                bail!(
                    "{} of {} files failed, {} skipped",
                    report.failed(),
                    report.total(),
                    report.skipped.len()
                );
            }
        }
        Commands::Probe { input } => {
            let analyzer = MediaAnalyzer::new(MediaProbeFactory::create_prober(&config.media));
            let report = analyzer.analyze(&input).await;

            println!("{}", serde_json::to_string_pretty(&report.media)?);
            if let Some(issue) = &report.issue {
                println!("\nAnalysis incomplete: {}", issue);
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                println!("# {}", config_path.display());
                println!("{}", toml::to_string_pretty(&config)?);
            }
            ConfigAction::Init { force } => {
                if config_path.exists() && !force {
                    bail!(
                        "{} already exists (use --force to replace it)",
                        config_path.display()
                    );
                }
                Config::default().save_to_file(&config_path)?;
                println!("Wrote default configuration to {}", config_path.display());
            }
            ConfigAction::Recent => {
                if config.recent.files.is_empty() {
                    println!("No recent files.");
                } else {
                    println!("\nRecent files:");
                    for file in &config.recent.files {
                        println!("  {}", file);
                    }
                    println!("\nRecent outputs:");
                    for output in &config.recent.outputs {
                        println!("  {}", output);
                    }
                }
            }
            ConfigAction::ClearRecent => {
                config.recent.clear();
                config.save_to_file(&config_path)?;
                println!("Cleared recent files");
            }
        },
    }

    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".henkan").join("log");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = rolling::daily(&log_dir, "henkan.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("henkan.log").display()
    );

    Ok(())
}

/// Turn command line encoding flags into workflow options
fn build_options(encode: &EncodeArgs) -> Result<ConversionOptions> {
    let target: Container = encode.format.parse()?;

    let overrides = SettingsOverride {
        video_codec: encode
            .video_codec
            .as_deref()
            .map(str::parse::<VideoCodec>)
            .transpose()?,
        audio_codec: encode
            .audio_codec
            .as_deref()
            .map(str::parse::<AudioCodec>)
            .transpose()?,
        quality: encode.quality,
        preset: encode.preset.as_deref().map(str::parse::<Preset>).transpose()?,
        audio_bitrate: encode.audio_bitrate.clone(),
        remux: if encode.no_remux {
            RemuxPolicy::Never
        } else {
            RemuxPolicy::Auto
        },
    };

    let policy = if encode.overwrite {
        OutputPolicy::Overwrite
    } else if encode.refuse {
        OutputPolicy::Refuse
    } else {
        OutputPolicy::Rename
    };

    Ok(ConversionOptions {
        target,
        overrides,
        output_dir: encode.output_dir.clone(),
        policy,
        mirror_root: None,
    })
}

/// Write successful jobs back into the configuration file
fn remember(config: &mut Config, path: &Path, outcomes: &[JobOutcome]) {
    if outcomes.is_empty() {
        return;
    }
    for outcome in outcomes {
        config.remember(outcome);
    }
    if let Err(e) = config.save_to_file(path) {
        warn!("Could not update {}: {}", path.display(), e);
    }
}

fn print_outcome(outcome: &JobOutcome) {
    let mode = if outcome.remux_only { "remuxed" } else { "encoded" };
    println!(
        "{} -> {} ({}, {})",
        outcome.input,
        outcome.output,
        mode,
        format_duration(outcome.elapsed_secs)
    );
}

fn print_batch_report(report: &BatchReport) {
    println!(
        "\nBatch summary: {} succeeded, {} failed, {} skipped",
        report.succeeded(),
        report.failed(),
        report.skipped.len()
    );

    if !report.outcomes.is_empty() {
        println!("\nSucceeded:");
        for outcome in &report.outcomes {
            print!("  ");
            print_outcome(outcome);
        }
    }

    if !report.failures.is_empty() {
        println!("\nFailed:");
        println!("  {:<12} {}", "Reason", "File");
        println!("  {}", "-".repeat(60));
        for failure in &report.failures {
            println!("  {:<12} {}", failure.reason.label(), failure.path.display());
            println!("  {:<12} {}", "", failure.message);
        }
    }

    if !report.skipped.is_empty() {
        println!("\nSkipped (cancelled):");
        for path in &report.skipped {
            println!("  {}", path.display());
        }
    }
}

/// Format duration in seconds to human readable string
fn format_duration(seconds: f64) -> String {
    let seconds = seconds.max(0.0).round() as u64;
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}
