//! Config command handler

use crate::application::ports::ConfigStore;
use crate::domain::audio::VisualizationMode;
use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;
use crate::domain::recording::{CaptureSourceKind, Duration};

use super::args::{is_valid_config_key, ConfigAction, VALID_CONFIG_KEYS};
use super::presenter::Presenter;

const NOT_SET: &str = "(not set)";

/// Handle config subcommand
pub async fn handle_config_command<S: ConfigStore>(
    action: ConfigAction,
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Init => handle_init(store, presenter).await,
        ConfigAction::Set { key, value } => handle_set(store, presenter, &key, &value).await,
        ConfigAction::Get { key } => handle_get(store, presenter, &key).await,
        ConfigAction::List => handle_list(store, presenter).await,
        ConfigAction::Path => handle_path(store, presenter),
    }
}

async fn handle_init<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    store.init().await?;
    presenter.success(&format!(
        "Config file created at: {}",
        store.path().display()
    ));
    Ok(())
}

async fn handle_set<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    ensure_known_key(key)?;
    validate_config_value(key, value)?;

    let mut config = store.load().await?;
    apply_value(&mut config, key, value)?;

    store.save(&config).await?;
    let shown = if key == "api_key" {
        mask_api_key(value)
    } else {
        value.to_string()
    };
    presenter.success(&format!("{} = {}", key, shown));

    Ok(())
}

async fn handle_get<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    ensure_known_key(key)?;

    let config = store.load().await?;
    match display_value(&config, key) {
        Some(v) => presenter.output(&v),
        None => presenter.output(NOT_SET),
    }

    Ok(())
}

async fn handle_list<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    let config = store.load().await?;
    for key in VALID_CONFIG_KEYS {
        presenter.key_value(
            key,
            display_value(&config, key).as_deref().unwrap_or(NOT_SET),
        );
    }
    Ok(())
}

fn handle_path<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    presenter.output(&store.path().to_string_lossy());
    Ok(())
}

fn ensure_known_key(key: &str) -> Result<(), ConfigError> {
    if is_valid_config_key(key) {
        return Ok(());
    }
    Err(ConfigError::ValidationError {
        key: key.to_string(),
        message: format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
    })
}

/// Store a validated value under its key
fn apply_value(config: &mut AppConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    let value = value.trim().to_string();
    match key {
        "api_url" => config.api_url = Some(value),
        "api_key" => config.api_key = Some(value),
        "source" => config.source = Some(value),
        "chunk_interval" => config.chunk_interval = Some(value),
        "max_duration" => config.max_duration = Some(value),
        "visualizer" => config.visualizer = Some(value),
        "spectrum_bars" => config.spectrum_bars = Some(parse_bars(key, &value)?),
        "recovery_dir" => config.recovery_dir = Some(value),
        "retention" => config.retention = Some(value),
        "upload_timeout" => config.upload_timeout = Some(value),
        _ => return ensure_known_key(key),
    }
    Ok(())
}

/// Value as shown by `get` and `list`, with the API key masked
fn display_value(config: &AppConfig, key: &str) -> Option<String> {
    match key {
        "api_url" => config.api_url.clone(),
        "api_key" => config.api_key.as_deref().map(mask_api_key),
        "source" => config.source.clone(),
        "chunk_interval" => config.chunk_interval.clone(),
        "max_duration" => config.max_duration.clone(),
        "visualizer" => config.visualizer.clone(),
        "spectrum_bars" => config.spectrum_bars.map(|b| b.to_string()),
        "recovery_dir" => config.recovery_dir.clone(),
        "retention" => config.retention.clone(),
        "upload_timeout" => config.upload_timeout.clone(),
        _ => None,
    }
}

/// Validate a config value based on key type
fn validate_config_value(key: &str, value: &str) -> Result<(), ConfigError> {
    let invalid = |message: String| ConfigError::ValidationError {
        key: key.to_string(),
        message,
    };

    match key {
        "chunk_interval" | "max_duration" | "retention" | "upload_timeout" => {
            value
                .parse::<Duration>()
                .map_err(|e| invalid(e.to_string()))?;
        }
        "source" => {
            value
                .parse::<CaptureSourceKind>()
                .map_err(|e| invalid(e.to_string()))?;
        }
        "visualizer" => {
            value.parse::<VisualizationMode>().map_err(invalid)?;
        }
        "spectrum_bars" => {
            parse_bars(key, value)?;
        }
        "api_url" => {
            let trimmed = value.trim();
            if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
                return Err(invalid(
                    "Value must start with http:// or https://".to_string(),
                ));
            }
        }
        "recovery_dir" => {
            if value.trim().is_empty() {
                return Err(invalid("Value must not be empty".to_string()));
            }
        }
        _ => {} // api_key accepts any string
    }
    Ok(())
}

fn parse_bars(key: &str, value: &str) -> Result<u32, ConfigError> {
    match value.trim().parse::<u32>() {
        Ok(bars) if (1..=64).contains(&bars) => Ok(bars),
        _ => Err(ConfigError::ValidationError {
            key: key.to_string(),
            message: "Value must be a whole number between 1 and 64".to_string(),
        }),
    }
}

/// Mask API key for display (show first 4 and last 4 chars)
fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}
