//! Audio capture using cpal
//!
//! The microphone is the host's default input device. Tab audio is taken
//! from a PipeWire/PulseAudio monitor source, which exposes what other
//! applications play as an input device.
//!
//! `cpal::Stream` is not `Send`, so each stream lives on its own thread and
//! forwards samples over a channel. The thread exits once the receiving
//! `CaptureStream` is dropped.

use std::thread;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BuildStreamError, SampleFormat, StreamError};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::application::ports::{
    CaptureError, CaptureEvent, CaptureSource, CaptureStream, CaptureWarning,
};
use crate::domain::audio::PcmFormat;
use crate::domain::recording::CaptureSourceKind;

/// How often the capture thread checks whether it is still wanted
const POLL_INTERVAL: StdDuration = StdDuration::from_millis(100);

/// Samples per frame of degraded (silent) capture: 100 ms at 16 kHz
const SILENT_FRAME: usize = 1_600;

type Ready = oneshot::Sender<Result<(PcmFormat, Option<CaptureWarning>), CaptureError>>;

/// Capture source backed by the default cpal host
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalCapture;

impl CpalCapture {
    pub fn new() -> Self {
        Self
    }

    /// Name of the device that would be used for a source, if any
    pub fn device_name(&self, kind: CaptureSourceKind) -> Option<String> {
        find_device(kind).and_then(|device| device.name().ok())
    }
}

fn find_device(kind: CaptureSourceKind) -> Option<cpal::Device> {
    let host = cpal::default_host();
    match kind {
        CaptureSourceKind::Microphone => host.default_input_device(),
        CaptureSourceKind::TabAudio => host.input_devices().ok()?.find(|device| {
            device
                .name()
                .map(|name| name.to_lowercase().contains("monitor"))
                .unwrap_or(false)
        }),
    }
}

/// Map a backend message onto the capture error taxonomy
fn classify(message: String) -> CaptureError {
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not authorized")
    {
        CaptureError::PermissionDenied(message)
    } else {
        CaptureError::CaptureFailure(message)
    }
}

fn classify_build(error: BuildStreamError) -> CaptureError {
    match error {
        BuildStreamError::DeviceNotAvailable => {
            CaptureError::SourceUnavailable("capture device is no longer available".to_string())
        }
        other => classify(other.to_string()),
    }
}

/// Runtime stream errors. Only a lost device ends the capture; backend
/// hiccups such as xruns are logged and the stream keeps running.
fn stream_error_event(error: StreamError) -> Option<CaptureEvent> {
    match error {
        StreamError::DeviceNotAvailable => Some(CaptureEvent::Failed(
            "capture device is no longer available".to_string(),
        )),
        StreamError::BackendSpecific { err } => {
            warn!("Capture stream error: {}", err);
            None
        }
    }
}

fn f32_to_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect()
}

/// Keep a degraded recording going with silence until the stream is dropped
fn emit_silence(events: &mpsc::UnboundedSender<CaptureEvent>) {
    loop {
        thread::sleep(POLL_INTERVAL);
        if events
            .send(CaptureEvent::Samples(vec![0; SILENT_FRAME]))
            .is_err()
        {
            break;
        }
    }
}

fn degrade(reason: &str, events: &mpsc::UnboundedSender<CaptureEvent>, ready: Ready) {
    warn!("Monitor source has no usable audio ({}), recording silence", reason);
    if ready
        .send(Ok((PcmFormat::speech(), Some(CaptureWarning::NoAudioTrack))))
        .is_ok()
    {
        emit_silence(events);
    }
}

fn run_capture(kind: CaptureSourceKind, events: mpsc::UnboundedSender<CaptureEvent>, ready: Ready) {
    let Some(device) = find_device(kind) else {
        let message = match kind {
            CaptureSourceKind::Microphone => "no microphone found",
            CaptureSourceKind::TabAudio => "no monitor source found",
        };
        let _ = ready.send(Err(CaptureError::SourceUnavailable(message.to_string())));
        return;
    };
    let name = device.name().unwrap_or_else(|_| "unknown device".to_string());

    let supported = match device.default_input_config() {
        Ok(config) => config,
        Err(e) if kind == CaptureSourceKind::TabAudio => {
            degrade(&e.to_string(), &events, ready);
            return;
        }
        Err(e) => {
            let _ = ready.send(Err(classify(e.to_string())));
            return;
        }
    };

    let format = PcmFormat::new(supported.sample_rate().0, supported.channels());
    let config = supported.config();
    let error_tx = events.clone();
    let on_error = move |err: StreamError| {
        if let Some(event) = stream_error_event(err) {
            let _ = error_tx.send(event);
        }
    };

    let stream = match supported.sample_format() {
        SampleFormat::I16 => {
            let tx = events.clone();
            device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let _ = tx.send(CaptureEvent::Samples(data.to_vec()));
                },
                on_error,
                None,
            )
        }
        SampleFormat::F32 => {
            let tx = events.clone();
            device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let _ = tx.send(CaptureEvent::Samples(f32_to_i16(data)));
                },
                on_error,
                None,
            )
        }
        other if kind == CaptureSourceKind::TabAudio => {
            degrade(&format!("unsupported sample format {:?}", other), &events, ready);
            return;
        }
        other => {
            let _ = ready.send(Err(CaptureError::CaptureFailure(format!(
                "unsupported sample format {:?}",
                other
            ))));
            return;
        }
    };

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(classify_build(e)));
            return;
        }
    };
    if let Err(e) = stream.play() {
        let _ = ready.send(Err(classify(e.to_string())));
        return;
    }

    info!(
        device = %name,
        sample_rate = format.sample_rate,
        channels = format.channels,
        "Capture started"
    );
    if ready.send(Ok((format, None))).is_err() {
        return;
    }

    while !events.is_closed() {
        thread::sleep(POLL_INTERVAL);
    }
    drop(stream);
    debug!(device = %name, "Capture stopped");
}

#[async_trait]
impl CaptureSource for CpalCapture {
    fn supports(&self, kind: CaptureSourceKind) -> bool {
        find_device(kind).is_some()
    }

    async fn open(&self, kind: CaptureSourceKind) -> Result<CaptureStream, CaptureError> {
        let (events, rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();

        thread::Builder::new()
            .name(format!("capture-{}", kind))
            .spawn(move || run_capture(kind, events, ready_tx))
            .map_err(|e| CaptureError::CaptureFailure(format!("failed to spawn capture thread: {}", e)))?;

        let (format, warning) = ready_rx.await.map_err(|_| {
            CaptureError::CaptureFailure("capture thread exited during setup".to_string())
        })??;

        let stream = CaptureStream::new(format, rx);
        Ok(match warning {
            Some(warning) => stream.with_warning(warning),
            None => stream,
        })
    }
}
