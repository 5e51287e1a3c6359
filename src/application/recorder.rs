//! Chunked recorder use case

use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration as StdDuration, Instant as StdInstant};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::domain::audio::wav::{self, WavError};
use crate::domain::audio::{AudioData, AudioLevelAnalyzer, LevelSample, PcmFormat, VisualizationMode};
use crate::domain::recording::{
    CaptureSourceKind, Duration, InvalidStateTransition, RecorderState, RecordingSession,
    SessionId, Transition,
};

use super::persistence::{PersistenceHandle, PersistenceWriter};
use super::ports::{
    CaptureError, CaptureEvent, CaptureSource, CaptureStream, CaptureWarning, RecoveryError,
    RecoveryStore,
};

/// Errors from the recorder use case
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("Capture failed: {0}")]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    InvalidState(#[from] InvalidStateTransition),

    #[error("Recovery store error: {0}")]
    Recovery(#[from] RecoveryError),

    #[error("Failed to encode audio: {0}")]
    Encoding(#[from] WavError),
}

/// Configuration for the recorder
#[derive(Debug, Clone, Copy)]
pub struct RecorderConfig {
    /// How often buffered audio is cut into a chunk
    pub chunk_interval: Duration,
    /// What the live meter shows
    pub visualization: VisualizationMode,
    /// Stop automatically once this much audio is recorded
    pub max_duration: Option<Duration>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            chunk_interval: Duration::default_chunk_interval(),
            visualization: VisualizationMode::default(),
            max_duration: Some(Duration::default_max_duration()),
        }
    }
}

/// A stopped session assembled into one file
#[derive(Debug, Clone)]
pub struct FinishedRecording {
    pub id: SessionId,
    pub source: CaptureSourceKind,
    pub audio: AudioData,
    pub duration: StdDuration,
    pub created_at: DateTime<Utc>,
    pub chunk_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Pause,
    Resume,
    Stop,
}

impl Control {
    fn apply(
        self,
        session: &mut RecordingSession,
        now: StdInstant,
    ) -> Result<Transition, InvalidStateTransition> {
        match self {
            Self::Pause => session.pause(now),
            Self::Resume => session.resume(now),
            Self::Stop => session.stop(now),
        }
    }
}

struct Command {
    control: Control,
    reply: oneshot::Sender<Result<Transition, InvalidStateTransition>>,
}

/// State shared between the recorder handle and its pump task
struct Shared {
    session: Mutex<RecordingSession>,
    state: watch::Sender<RecorderState>,
    levels: watch::Sender<LevelSample>,
    last_error: StdMutex<Option<CaptureError>>,
}

impl Shared {
    fn publish_state(&self, state: RecorderState) {
        self.state.send_replace(state);
    }

    fn publish_silence(&self, mode: VisualizationMode) {
        self.levels.send_replace(LevelSample::silent(mode));
    }

    fn set_last_error(&self, error: Option<CaptureError>) {
        if let Ok(mut last) = self.last_error.lock() {
            *last = error;
        }
    }

    fn last_error(&self) -> Option<CaptureError> {
        self.last_error.lock().ok().and_then(|last| last.clone())
    }
}

/// Tokio's clock, so paused-time tests drive the stopwatch too
fn clock_now() -> StdInstant {
    Instant::now().into_std()
}

/// Records from a capture source into fixed-interval chunks.
///
/// Every chunk is appended to the in-memory session first and then queued
/// for the recovery store, so the durable copy is never ahead of memory.
pub struct ChunkedRecorder<C, S>
where
    C: CaptureSource,
    S: RecoveryStore,
{
    capture: C,
    store: Arc<S>,
    config: RecorderConfig,
    shared: Arc<Shared>,
    persistence: PersistenceHandle,
    pump: Mutex<Option<mpsc::UnboundedSender<Command>>>,
}

impl<C, S> ChunkedRecorder<C, S>
where
    C: CaptureSource,
    S: RecoveryStore + 'static,
{
    /// Create a new recorder. Must be called within a tokio runtime.
    pub fn new(capture: C, store: Arc<S>, config: RecorderConfig) -> Self {
        let (state, _) = watch::channel(RecorderState::Idle);
        let (levels, _) = watch::channel(LevelSample::silent(config.visualization));
        let persistence = PersistenceWriter::spawn(Arc::clone(&store));

        Self {
            capture,
            store,
            config,
            shared: Arc::new(Shared {
                session: Mutex::new(RecordingSession::new()),
                state,
                levels,
                last_error: StdMutex::new(None),
            }),
            persistence,
            pump: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Current lifecycle state
    pub fn state(&self) -> RecorderState {
        *self.shared.state.borrow()
    }

    /// Subscribe to lifecycle state changes
    pub fn state_changes(&self) -> watch::Receiver<RecorderState> {
        self.shared.state.subscribe()
    }

    /// Subscribe to live meter readings
    pub fn levels(&self) -> watch::Receiver<LevelSample> {
        self.shared.levels.subscribe()
    }

    /// The capture error that last ended a session or blocked a start
    pub fn last_error(&self) -> Option<CaptureError> {
        self.shared.last_error()
    }

    /// Recorded time, excluding pauses
    pub async fn elapsed(&self) -> StdDuration {
        self.shared.session.lock().await.elapsed(clock_now())
    }

    pub async fn session_id(&self) -> SessionId {
        self.shared.session.lock().await.id().clone()
    }

    pub async fn chunk_count(&self) -> usize {
        self.shared.session.lock().await.chunks().len()
    }

    /// Chunks that could not be written to the recovery store
    pub fn persistence_failures(&self) -> u64 {
        self.persistence.failures()
    }

    /// Wait until all queued chunk writes have reached the store
    pub async fn flush(&self) {
        self.persistence.flush().await;
    }

    /// Start recording from the given source.
    ///
    /// # Returns
    /// A non-fatal warning if the source opened in a degraded mode
    pub async fn start(
        &self,
        kind: CaptureSourceKind,
    ) -> Result<Option<CaptureWarning>, RecorderError> {
        let mut session = self.shared.session.lock().await;

        // Never prompt for a source the host cannot provide
        if session.is_idle() && !self.capture.supports(kind) {
            let error = CaptureError::SourceUnavailable(format!(
                "{} capture is not supported on this system",
                kind.label()
            ));
            warn!("{}", error);
            self.shared.set_last_error(Some(error.clone()));
            return Err(error.into());
        }

        session.request_permission(kind)?;
        self.shared.set_last_error(None);
        self.shared.publish_state(session.state());
        drop(session);

        debug!(source = %kind, "Requesting capture permission");
        let opened = self.capture.open(kind).await;

        let mut session = self.shared.session.lock().await;
        let stream = match opened {
            Ok(stream) => stream,
            Err(error) => {
                session.permission_failed()?;
                warn!(source = %kind, "Could not open capture source: {}", error);
                self.shared.set_last_error(Some(error.clone()));
                self.shared.publish_state(session.state());
                return Err(error.into());
            }
        };

        let format = stream.format();
        let warning = stream.warning();
        if let Some(warning) = warning {
            warn!(source = %kind, "{}", warning);
        }

        session.permission_granted(format, clock_now())?;
        // Published before the pump exists so no early samples are dropped
        self.shared.publish_state(session.state());

        let (commands, rx) = mpsc::unbounded_channel();
        let pump = Pump {
            shared: Arc::clone(&self.shared),
            stream,
            commands: rx,
            persistence: self.persistence.clone(),
            analyzer: AudioLevelAnalyzer::new(self.config.visualization),
            config: self.config,
            format,
            buffer: Vec::new(),
        };
        tokio::spawn(pump.run());
        *self.pump.lock().await = Some(commands);

        info!(
            session = %session.id(),
            source = %kind,
            sample_rate = format.sample_rate,
            channels = format.channels,
            "Recording started"
        );

        Ok(warning)
    }

    /// Pause recording. Pausing twice is a no-op.
    pub async fn pause(&self) -> Result<Transition, RecorderError> {
        self.command(Control::Pause).await
    }

    /// Resume a paused recording. Resuming twice is a no-op.
    pub async fn resume(&self) -> Result<Transition, RecorderError> {
        self.command(Control::Resume).await
    }

    /// Stop recording. Stopping an idle or stopped recorder is a no-op.
    pub async fn stop(&self) -> Result<Transition, RecorderError> {
        self.command(Control::Stop).await
    }

    async fn command(&self, control: Control) -> Result<Transition, RecorderError> {
        let sender = self.pump.lock().await.clone();
        if let Some(sender) = sender {
            let (reply, response) = oneshot::channel();
            if sender.send(Command { control, reply }).is_ok() {
                if let Ok(result) = response.await {
                    return Ok(result?);
                }
            }
        }

        // No live capture; apply directly to the session
        let mut session = self.shared.session.lock().await;
        let transition = control.apply(&mut session, clock_now())?;
        if transition == Transition::Applied {
            self.shared.publish_state(session.state());
        }
        Ok(transition)
    }

    /// Assemble the stopped session into a single file
    pub async fn finished(&self) -> Result<FinishedRecording, RecorderError> {
        let session = self.shared.session.lock().await;
        if !session.is_stopped() {
            return Err(InvalidStateTransition {
                current_state: session.state(),
                action: "take the finished recording".to_string(),
            }
            .into());
        }

        Ok(FinishedRecording {
            id: session.id().clone(),
            source: session.source(),
            audio: session.assemble()?,
            duration: session.elapsed(clock_now()),
            created_at: session.created_at(),
            chunk_count: session.chunks().len(),
        })
    }

    /// Return a stopped recorder to idle with a fresh session
    pub async fn reset(&self) -> Result<(), RecorderError> {
        let mut session = self.shared.session.lock().await;
        session.reset()?;
        self.shared.set_last_error(None);
        self.shared.publish_state(session.state());
        self.shared.publish_silence(self.config.visualization);
        Ok(())
    }

    /// Stop any capture, delete the session's recovery entry and reset.
    ///
    /// # Returns
    /// The id of the discarded session
    pub async fn discard(&self) -> Result<SessionId, RecorderError> {
        self.stop().await?;
        // Pending writes would otherwise recreate the entry after deletion
        self.persistence.flush().await;

        let id = self.session_id().await;
        self.store.delete(&id).await?;
        self.reset().await?;

        info!(session = %id, "Recording discarded");
        Ok(id)
    }
}

/// Background task owning the live stream for one session
struct Pump {
    shared: Arc<Shared>,
    stream: CaptureStream,
    commands: mpsc::UnboundedReceiver<Command>,
    persistence: PersistenceHandle,
    analyzer: AudioLevelAnalyzer,
    config: RecorderConfig,
    format: PcmFormat,
    buffer: Vec<i16>,
}

impl Pump {
    async fn run(mut self) {
        let period = self.config.chunk_interval.as_std();
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(Command { control, reply }) = command else {
                        debug!("Recorder dropped, abandoning capture");
                        break;
                    };

                    let result = self.handle(control).await;
                    let applied = matches!(result, Ok(Transition::Applied));
                    let _ = reply.send(result);

                    if applied && control == Control::Resume {
                        ticker.reset();
                    }
                    if applied && control == Control::Stop {
                        break;
                    }
                }
                event = self.stream.next_event() => match event {
                    Some(CaptureEvent::Samples(samples)) => self.on_samples(&samples),
                    Some(CaptureEvent::Failed(reason)) => {
                        self.fail(CaptureError::CaptureFailure(reason)).await;
                        break;
                    }
                    None => {
                        self.fail(CaptureError::CaptureFailure(
                            "capture stream ended unexpectedly".to_string(),
                        ))
                        .await;
                        break;
                    }
                },
                _ = ticker.tick() => {
                    if self.on_tick().await {
                        break;
                    }
                }
            }
        }
    }

    async fn handle(&mut self, control: Control) -> Result<Transition, InvalidStateTransition> {
        let shared = Arc::clone(&self.shared);
        let mut session = shared.session.lock().await;
        let now = clock_now();

        if control != Control::Resume {
            self.emit_chunk(&mut session, now);
        }

        let result = control.apply(&mut session, now);
        if let Ok(Transition::Applied) = result {
            shared.publish_state(session.state());
            if control != Control::Resume {
                shared.publish_silence(self.analyzer.mode());
            }
            info!(
                session = %session.id(),
                elapsed_ms = session.elapsed(now).as_millis() as u64,
                chunks = session.chunks().len(),
                "Recording {}",
                session.state()
            );
        }
        result
    }

    fn on_samples(&mut self, samples: &[i16]) {
        // Samples captured while paused are dropped
        if *self.shared.state.borrow() != RecorderState::Recording {
            return;
        }

        if self.analyzer.mode() != VisualizationMode::Off {
            let reading =
                self.analyzer
                    .analyze(samples, self.format.channels, self.format.sample_rate);
            self.shared.levels.send_replace(reading);
        }
        self.buffer.extend_from_slice(samples);
    }

    /// Returns true when the max duration stopped the session
    async fn on_tick(&mut self) -> bool {
        let shared = Arc::clone(&self.shared);
        let mut session = shared.session.lock().await;
        let now = clock_now();

        self.emit_chunk(&mut session, now);

        let Some(limit) = self.config.max_duration else {
            return false;
        };
        if !session.is_recording() || session.elapsed(now) < limit.as_std() {
            return false;
        }

        info!(limit = %limit, "Maximum recording duration reached, stopping");
        if let Ok(Transition::Applied) = session.stop(now) {
            shared.publish_state(session.state());
            shared.publish_silence(self.analyzer.mode());
            return true;
        }
        false
    }

    async fn fail(&mut self, error: CaptureError) {
        let shared = Arc::clone(&self.shared);
        let mut session = shared.session.lock().await;

        // Keep whatever was captured before the failure
        self.emit_chunk(&mut session, clock_now());

        let abandoned = session.fail();
        warn!(session = %abandoned, "Recording abandoned: {}", error);

        shared.set_last_error(Some(error));
        shared.publish_state(session.state());
        shared.publish_silence(self.analyzer.mode());
    }

    /// Cut buffered samples into a chunk and hand it to persistence
    fn emit_chunk(&mut self, session: &mut RecordingSession, now: StdInstant) {
        if self.buffer.is_empty() || !session.is_recording() {
            return;
        }

        let data = wav::encode_samples(&self.buffer);
        self.buffer.clear();

        if let Ok(chunk) = session.append_chunk(data, now) {
            let chunk = chunk.clone();
            debug!(
                session = %session.id(),
                sequence = chunk.sequence(),
                bytes = chunk.len(),
                "Chunk recorded"
            );
            self.persistence.save(session.manifest(now), chunk);
        }
    }
}
