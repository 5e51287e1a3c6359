//! CLI argument definitions using Clap

use clap::{ArgAction, Parser, Subcommand};

use crate::domain::audio::VisualizationMode;
use crate::domain::recording::{CaptureSourceKind, Duration};

/// ScribeRecorder - crash-safe audio recording for transcription
#[derive(Parser, Debug)]
#[command(name = "scribe-recorder")]
#[command(version)]
#[command(about = "Record microphone or tab audio in crash-safe chunks and upload it for transcription")]
#[command(long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record audio, then upload it
    Record(RecordArgs),
    /// Manage recordings left behind by interrupted sessions
    Recover {
        #[command(subcommand)]
        action: RecoverAction,
    },
    /// Show which capture sources are available
    Devices,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Options for `record`
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RecordArgs {
    /// Capture source (microphone, tab-audio)
    #[arg(short = 's', long, value_name = "SOURCE")]
    pub source: Option<String>,

    /// Title sent with the upload
    #[arg(short = 't', long, value_name = "TITLE")]
    pub title: Option<String>,

    /// Stop automatically after this long (e.g., 30m, 1h30m)
    #[arg(short = 'm', long, value_name = "TIME")]
    pub max_duration: Option<String>,

    /// Live meter style (off, level, spectrum)
    #[arg(long, value_name = "MODE")]
    pub visualizer: Option<String>,

    /// Keep the recording locally instead of uploading it
    #[arg(long)]
    pub no_upload: bool,
}

/// Recovery actions
#[derive(Subcommand, Debug)]
pub enum RecoverAction {
    /// List recoverable recordings
    List,
    /// Upload a recovered recording and remove it locally
    Upload {
        /// Session id (or a unique prefix)
        id: String,
        /// Title sent with the upload
        #[arg(short = 't', long, value_name = "TITLE")]
        title: Option<String>,
    },
    /// Delete a recovered recording
    Discard {
        /// Session id (or a unique prefix)
        id: String,
    },
    /// Write a recovered recording to a file
    Export {
        /// Session id (or a unique prefix)
        id: String,
        /// Destination file
        path: std::path::PathBuf,
    },
    /// Delete recordings older than the retention period
    Prune {
        /// Override the configured retention (e.g., 3d, 12h)
        #[arg(long, value_name = "TIME")]
        older_than: Option<String>,
    },
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Parsed record options
#[derive(Debug, Clone)]
pub struct RecordOptions {
    pub source: CaptureSourceKind,
    pub title: Option<String>,
    pub chunk_interval: Duration,
    pub max_duration: Duration,
    pub visualization: VisualizationMode,
    pub upload: bool,
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "api_url",
    "api_key",
    "source",
    "chunk_interval",
    "max_duration",
    "visualizer",
    "spectrum_bars",
    "recovery_dir",
    "retention",
    "upload_timeout",
];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}
