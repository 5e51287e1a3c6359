//! Main app runner for the record command

use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use tokio::time;

use crate::application::ports::{CaptureSource, ConfigStore, RecoveryStore};
use crate::application::{
    ChunkedRecorder, RecorderConfig, RecorderError, RecoveryService, UploadCoordinator,
    UploadCoordinatorError,
};
use crate::domain::audio::VisualizationMode;
use crate::domain::config::AppConfig;
use crate::domain::recording::{CaptureSourceKind, Duration, RecorderState, SessionId};
use crate::domain::recovery::{RecoveryPrompts, RetentionPolicy};
use crate::infrastructure::config::recovery_dir;
use crate::infrastructure::{CpalCapture, FsRecoveryStore, HttpUploader, XdgConfigStore};

use super::args::RecordOptions;
use super::console::ConsoleInput;
use super::presenter::{format_clock, Presenter};
use super::signals::{describe, ControlSignal, ControlSignals};

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

/// Environment variable overriding `api_url`
pub const ENV_API_URL: &str = "SCRIBE_API_URL";
/// Environment variable overriding `api_key`
pub const ENV_API_KEY: &str = "SCRIBE_API_KEY";

/// How often the live meter is redrawn
const METER_REFRESH: StdDuration = StdDuration::from_millis(100);

/// How a live recording ended
#[derive(Debug)]
enum Outcome {
    Stopped,
    Discarded(SessionId),
    Failed(String),
}

/// Record until stopped, then upload
pub async fn run_record(options: RecordOptions, config: AppConfig) -> ExitCode {
    let mut presenter = Presenter::new();

    // Check credentials before capturing anything
    let uploader = if options.upload {
        match build_uploader(&config) {
            Ok(uploader) => Some(uploader),
            Err(e) => {
                presenter.error(&e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
    } else {
        None
    };

    let store = open_store(&config);
    let recovery = RecoveryService::new(Arc::clone(&store));
    prune_expired(&recovery, &config, &presenter).await;
    offer_recoverable(&recovery, &presenter).await;

    let mut signals = match ControlSignals::new() {
        Ok(signals) => signals,
        Err(e) => {
            presenter.error(&format!("Failed to setup signal handler: {}", e));
            return ExitCode::from(EXIT_ERROR);
        }
    };
    let mut console = ConsoleInput::spawn();

    let recorder = ChunkedRecorder::new(
        CpalCapture::new(),
        Arc::clone(&store),
        RecorderConfig {
            chunk_interval: options.chunk_interval,
            visualization: options.visualization,
            max_duration: Some(options.max_duration),
        },
    );

    match recorder.start(options.source).await {
        Ok(Some(warning)) => presenter.warn(&warning.to_string()),
        Ok(None) => {}
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    }

    let id = recorder.session_id().await;
    presenter.info(&format!(
        "Recording {} (session {}, stops after {})",
        options.source.label(),
        id.short(),
        options.max_duration
    ));
    presenter.controls_hint();

    let outcome = drive_recording(&recorder, &mut signals, &mut console, &mut presenter).await;
    presenter.stop_spinner();

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };

    match outcome {
        Outcome::Discarded(id) => {
            presenter.success(&format!("Recording {} discarded", id.short()));
            ExitCode::from(EXIT_SUCCESS)
        }
        Outcome::Failed(message) => {
            recorder.flush().await;
            presenter.error(&format!("Recording failed: {}", message));
            presenter.info(&format!(
                "Audio captured so far is kept. Run `scribe-recorder recover upload {}` to send it",
                id.short()
            ));
            ExitCode::from(EXIT_ERROR)
        }
        Outcome::Stopped => {
            recorder.flush().await;
            let failures = recorder.persistence_failures();
            if failures > 0 {
                presenter.warn(&format!(
                    "{} chunk(s) could not be saved locally; the recording is not crash-safe",
                    failures
                ));
            }
            presenter.success(&format!(
                "Recorded {}",
                format_clock(recorder.elapsed().await)
            ));

            match uploader {
                Some(uploader) => {
                    let coordinator = UploadCoordinator::new(uploader, Arc::clone(&store));
                    upload_with_retry(
                        &coordinator,
                        &recorder,
                        options.title.as_deref(),
                        &mut console,
                        &mut presenter,
                    )
                    .await
                }
                None => {
                    presenter.info(&format!(
                        "Saved locally. Upload later with `scribe-recorder recover upload {}`",
                        id.short()
                    ));
                    ExitCode::from(EXIT_SUCCESS)
                }
            }
        }
    }
}

/// Pump controls and redraw the meter until the recording ends
async fn drive_recording<C, S>(
    recorder: &ChunkedRecorder<C, S>,
    signals: &mut ControlSignals,
    console: &mut ConsoleInput,
    presenter: &mut Presenter,
) -> Result<Outcome, RecorderError>
where
    C: CaptureSource + 'static,
    S: RecoveryStore + 'static,
{
    let mut states = recorder.state_changes();
    let levels = recorder.levels();
    let show_meter = recorder.config().visualization != VisualizationMode::Off;
    let mut redraw = time::interval(METER_REFRESH);

    // Capture may have failed before we subscribed
    if recorder.state() == RecorderState::Idle {
        if let Some(e) = recorder.last_error() {
            return Ok(Outcome::Failed(e.to_string()));
        }
    }

    presenter.start_meter();
    loop {
        tokio::select! {
            Some(control) = signals.recv() => {
                presenter.info(&describe(control));
                if let Some(outcome) = apply_control(recorder, control).await? {
                    return Ok(outcome);
                }
            }
            Some(line) = console.next_line() => {
                if let Some(control) = ControlSignal::from_line(&line) {
                    if let Some(outcome) = apply_control(recorder, control).await? {
                        return Ok(outcome);
                    }
                }
            }
            Ok(()) = states.changed() => {
                let state = *states.borrow_and_update();
                match state {
                    // Max duration reached
                    RecorderState::Stopped => return Ok(Outcome::Stopped),
                    RecorderState::Idle => {
                        let message = recorder
                            .last_error()
                            .map(|e| e.to_string())
                            .unwrap_or_else(|| "capture ended".to_string());
                        return Ok(Outcome::Failed(message));
                    }
                    _ => {}
                }
            }
            _ = redraw.tick() => {
                let elapsed = recorder.elapsed().await;
                let sample = show_meter.then(|| levels.borrow().clone());
                presenter.update_meter(recorder.state(), elapsed, sample.as_ref());
            }
        }
    }
}

async fn apply_control<C, S>(
    recorder: &ChunkedRecorder<C, S>,
    control: ControlSignal,
) -> Result<Option<Outcome>, RecorderError>
where
    C: CaptureSource + 'static,
    S: RecoveryStore + 'static,
{
    match control {
        ControlSignal::TogglePause => {
            match recorder.state() {
                RecorderState::Recording => {
                    recorder.pause().await?;
                }
                RecorderState::Paused => {
                    recorder.resume().await?;
                }
                _ => {}
            }
            Ok(None)
        }
        ControlSignal::Stop => {
            recorder.stop().await?;
            Ok(Some(Outcome::Stopped))
        }
        ControlSignal::Discard => Ok(Some(Outcome::Discarded(recorder.discard().await?))),
    }
}

/// Upload the stopped recording, asking to retry on failure
async fn upload_with_retry<C, S>(
    coordinator: &UploadCoordinator<HttpUploader, S>,
    recorder: &ChunkedRecorder<C, S>,
    title: Option<&str>,
    console: &mut ConsoleInput,
    presenter: &mut Presenter,
) -> ExitCode
where
    C: CaptureSource + 'static,
    S: RecoveryStore + 'static,
{
    let id = recorder.session_id().await;
    loop {
        presenter.start_spinner("Uploading...");
        match coordinator.upload_finished(recorder, title).await {
            Ok(receipt) => {
                presenter.spinner_success(&format!("Upload {} ({})", receipt.status, id.short()));
                presenter.output(&receipt.transcription_id);
                return ExitCode::from(EXIT_SUCCESS);
            }
            Err(UploadCoordinatorError::EmptyRecording) => {
                presenter.spinner_fail("Nothing was recorded");
                if let Err(e) = recorder.discard().await {
                    presenter.warn(&e.to_string());
                }
                return ExitCode::from(EXIT_ERROR);
            }
            Err(e) => {
                presenter.spinner_fail(&e.to_string());
                presenter.prompt("Retry upload? [Y/n]");
                if console.confirm(true).await {
                    continue;
                }
                presenter.info(&format!(
                    "Recording kept. Upload later with `scribe-recorder recover upload {}`",
                    id.short()
                ));
                return ExitCode::from(EXIT_ERROR);
            }
        }
    }
}

async fn prune_expired<S: RecoveryStore>(
    recovery: &RecoveryService<S>,
    config: &AppConfig,
    presenter: &Presenter,
) {
    let policy = RetentionPolicy::new(config.retention_or_default());
    match recovery.prune(&policy).await {
        Ok(removed) if !removed.is_empty() => presenter.info(&format!(
            "Removed {} recording(s) older than {}",
            removed.len(),
            policy.max_age()
        )),
        Ok(_) => {}
        Err(e) => presenter.warn(&format!("Could not prune old recordings: {}", e)),
    }
}

/// Mention recordings left behind by earlier runs
async fn offer_recoverable<S: RecoveryStore>(recovery: &RecoveryService<S>, presenter: &Presenter) {
    let mut prompts = RecoveryPrompts::new();
    match recovery.offer(&mut prompts).await {
        Ok(recordings) if !recordings.is_empty() => {
            presenter.warn(&format!(
                "Found {} unfinished recording(s) from earlier sessions:",
                recordings.len()
            ));
            for recording in &recordings {
                presenter.info(&format!(
                    "{}  {}  {}",
                    recording.id.short(),
                    recording.source,
                    recording.duration_label()
                ));
            }
            presenter.info("Use `scribe-recorder recover upload <id>` or `recover discard <id>`");
        }
        Ok(_) => {}
        Err(e) => presenter.warn(&format!("Could not read recovery store: {}", e)),
    }
}

/// Recovery store at the configured location
pub fn open_store(config: &AppConfig) -> Arc<FsRecoveryStore> {
    Arc::new(FsRecoveryStore::with_root(recovery_dir(config)))
}

/// Build the uploader, failing if no API key is configured
pub fn build_uploader(config: &AppConfig) -> Result<HttpUploader, String> {
    let api_key = config
        .api_key
        .as_deref()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| {
            format!(
                "Missing API key. Set {} environment variable or run 'scribe-recorder config set api_key <key>'",
                ENV_API_KEY
            )
        })?;

    Ok(HttpUploader::new(config.api_url_or_default(), api_key)
        .with_timeout(config.upload_timeout_or_default()))
}

/// Parse record options strictly, so bad values are reported instead of defaulted
pub fn parse_record_options(
    config: &AppConfig,
    title: Option<String>,
    upload: bool,
) -> Result<RecordOptions, String> {
    let source = match config.source.as_deref() {
        Some(s) => s.parse::<CaptureSourceKind>().map_err(|e| e.to_string())?,
        None => CaptureSourceKind::default(),
    };
    let chunk_interval = parse_duration("chunk-interval", config.chunk_interval.as_deref())?
        .unwrap_or_else(Duration::default_chunk_interval);
    let max_duration = parse_duration("max-duration", config.max_duration.as_deref())?
        .unwrap_or_else(Duration::default_max_duration);
    let visualization = match config.visualizer.as_deref() {
        Some(s) => s.parse::<VisualizationMode>()?,
        None => VisualizationMode::default(),
    };
    let visualization = match config.spectrum_bars {
        Some(bars) => visualization.with_bars(bars as usize),
        None => visualization,
    };

    Ok(RecordOptions {
        source,
        title: title.filter(|t| !t.trim().is_empty()),
        chunk_interval,
        max_duration,
        visualization,
        upload,
    })
}

fn parse_duration(name: &str, value: Option<&str>) -> Result<Option<Duration>, String> {
    value
        .map(|s| {
            s.parse::<Duration>()
                .map_err(|e| format!("Invalid {}: {}", name, e))
        })
        .transpose()
}

/// Load and merge configuration from file, env, and CLI
pub async fn load_merged_config(cli_config: AppConfig) -> AppConfig {
    let store = XdgConfigStore::new();
    let file_config = store.load().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Ignoring unreadable config file");
        AppConfig::empty()
    });

    let env_config = AppConfig {
        api_url: env::var(ENV_API_URL).ok().filter(|s| !s.is_empty()),
        api_key: env::var(ENV_API_KEY).ok().filter(|s| !s.is_empty()),
        ..Default::default()
    };

    // Merge: defaults < file < env < cli
    AppConfig::defaults()
        .merge(file_config)
        .merge(env_config)
        .merge(cli_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_options_from_defaults() {
        let options = parse_record_options(&AppConfig::defaults(), None, true).unwrap();
        assert_eq!(options.source, CaptureSourceKind::Microphone);
        assert_eq!(options.chunk_interval, Duration::from_secs(1));
        assert_eq!(options.max_duration, Duration::from_secs(2 * 3600));
        assert_eq!(options.visualization, VisualizationMode::Level);
        assert!(options.upload);
    }

    #[test]
    fn record_options_apply_spectrum_bars() {
        let config = AppConfig {
            visualizer: Some("spectrum".to_string()),
            spectrum_bars: Some(8),
            ..AppConfig::defaults()
        };
        let options = parse_record_options(&config, Some("  ".to_string()), false).unwrap();
        assert_eq!(options.visualization, VisualizationMode::Spectrum { bars: 8 });
        assert!(options.title.is_none());
    }

    #[test]
    fn record_options_reject_bad_values() {
        let bad_source = AppConfig {
            source: Some("webcam".to_string()),
            ..AppConfig::defaults()
        };
        assert!(parse_record_options(&bad_source, None, true).is_err());

        let bad_duration = AppConfig {
            max_duration: Some("soon".to_string()),
            ..AppConfig::defaults()
        };
        let err = parse_record_options(&bad_duration, None, true).unwrap_err();
        assert!(err.contains("max-duration"));
    }

    #[test]
    fn uploader_requires_api_key() {
        let err = build_uploader(&AppConfig::defaults()).err().unwrap();
        assert!(err.contains(ENV_API_KEY));

        let config = AppConfig {
            api_key: Some("key".to_string()),
            ..AppConfig::defaults()
        };
        assert!(build_uploader(&config).is_ok());
    }
}
