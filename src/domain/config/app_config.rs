//! Application configuration value object

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::audio::level::DEFAULT_SPECTRUM_BARS;
use crate::domain::audio::VisualizationMode;
use crate::domain::recording::{CaptureSourceKind, Duration};

/// Default base URL of the transcription backend
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub source: Option<String>,
    pub chunk_interval: Option<String>,
    pub max_duration: Option<String>,
    pub visualizer: Option<String>,
    pub spectrum_bars: Option<u32>,
    pub recovery_dir: Option<String>,
    pub retention: Option<String>,
    pub upload_timeout: Option<String>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            api_url: Some(DEFAULT_API_URL.to_string()),
            api_key: None,
            source: Some("microphone".to_string()),
            chunk_interval: Some("1s".to_string()),
            max_duration: Some("2h".to_string()),
            visualizer: Some("level".to_string()),
            spectrum_bars: Some(DEFAULT_SPECTRUM_BARS as u32),
            recovery_dir: None,
            retention: Some("7d".to_string()),
            upload_timeout: Some("5m".to_string()),
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            api_url: other.api_url.or(self.api_url),
            api_key: other.api_key.or(self.api_key),
            source: other.source.or(self.source),
            chunk_interval: other.chunk_interval.or(self.chunk_interval),
            max_duration: other.max_duration.or(self.max_duration),
            visualizer: other.visualizer.or(self.visualizer),
            spectrum_bars: other.spectrum_bars.or(self.spectrum_bars),
            recovery_dir: other.recovery_dir.or(self.recovery_dir),
            retention: other.retention.or(self.retention),
            upload_timeout: other.upload_timeout.or(self.upload_timeout),
        }
    }

    /// Get API base URL, without a trailing slash
    pub fn api_url_or_default(&self) -> String {
        self.api_url
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_API_URL)
            .trim_end_matches('/')
            .to_string()
    }

    /// Get capture source, or microphone if not set/invalid
    pub fn source_or_default(&self) -> CaptureSourceKind {
        self.source
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    /// Get chunk interval, or 1s if not set/invalid
    pub fn chunk_interval_or_default(&self) -> Duration {
        parse_or(&self.chunk_interval, Duration::default_chunk_interval())
    }

    /// Get max recording duration, or 2h if not set/invalid
    pub fn max_duration_or_default(&self) -> Duration {
        parse_or(&self.max_duration, Duration::default_max_duration())
    }

    /// Get recovery retention, or 7d if not set/invalid
    pub fn retention_or_default(&self) -> Duration {
        parse_or(&self.retention, Duration::default_retention())
    }

    /// Get upload timeout, or 5m if not set/invalid
    pub fn upload_timeout_or_default(&self) -> Duration {
        parse_or(&self.upload_timeout, Duration::default_upload_timeout())
    }

    /// Get visualizer mode with the configured bar count
    pub fn visualizer_or_default(&self) -> VisualizationMode {
        let bars = self
            .spectrum_bars
            .map(|b| b as usize)
            .unwrap_or(DEFAULT_SPECTRUM_BARS);
        self.visualizer
            .as_ref()
            .and_then(|s| s.parse::<VisualizationMode>().ok())
            .unwrap_or_default()
            .with_bars(bars)
    }

    /// Explicitly configured recovery directory, ignoring blank values
    pub fn recovery_dir_override(&self) -> Option<PathBuf> {
        self.recovery_dir
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
    }
}

fn parse_or(value: &Option<String>, default: Duration) -> Duration {
    value
        .as_ref()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
