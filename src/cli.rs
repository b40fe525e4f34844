use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path (default: henkan.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Encoding options shared by `convert` and `batch`
#[derive(clap::Args, Debug, Clone)]
pub struct EncodeArgs {
    /// Target format (mp4, mkv, mov, webm, avi, mp3, m4a, flac, wav, ogg)
    #[arg(short, long)]
    pub format: String,

    /// Output directory for converted files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Video codec (h264, hevc, vp9, mpeg4)
    #[arg(long)]
    pub video_codec: Option<String>,

    /// Audio codec (aac, mp3, opus, vorbis, flac, pcm_s16le)
    #[arg(long)]
    pub audio_codec: Option<String>,

    /// Quality (CRF-style, lower is better)
    #[arg(short, long)]
    pub quality: Option<u8>,

    /// Encoder preset (ultrafast .. veryslow)
    #[arg(long)]
    pub preset: Option<String>,

    /// Audio bitrate for lossy codecs, e.g. 192k
    #[arg(long)]
    pub audio_bitrate: Option<String>,

    /// Always re-encode, even when the codecs already match
    #[arg(long)]
    pub no_remux: bool,

    /// Replace existing outputs
    #[arg(long, conflicts_with = "refuse")]
    pub overwrite: bool,

    /// Fail instead of renaming when the output exists
    #[arg(long)]
    pub refuse: bool,

    /// Hide the progress bar
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a single media file
    Convert {
        /// Input media file
        #[arg(short, long)]
        input: PathBuf,

        /// Explicit output file (overrides --output-dir)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Trim start in seconds
        #[arg(long)]
        start: Option<f64>,

        /// Trim end in seconds
        #[arg(long)]
        end: Option<f64>,

        #[command(flatten)]
        encode: EncodeArgs,
    },

    /// Convert many files, continuing past failures
    Batch {
        /// Directory to scan (default: configured input directory)
        #[arg(short, long)]
        input_dir: Option<PathBuf>,

        /// Explicit list of files instead of a directory scan
        #[arg(long, num_args = 1..)]
        files: Vec<PathBuf>,

        /// Descend into sub-directories, mirroring them in the output
        #[arg(short, long)]
        recursive: bool,

        #[command(flatten)]
        encode: EncodeArgs,
    },

    /// Show what analysis finds in a file
    Probe {
        /// Input media file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },

    /// List recently converted files and outputs
    Recent,

    /// Forget recent files and outputs
    ClearRecent,
}
