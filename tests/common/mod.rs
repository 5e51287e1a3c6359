//! Test doubles shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};

use scribe_recorder::application::ports::{
    CaptureError, CaptureEvent, CaptureSource, CaptureStream, RecoveryError, RecoveryStore,
    UploadError, UploadFile, UploadReceipt, Uploader,
};
use scribe_recorder::domain::audio::{wav, AudioData, PcmFormat};
use scribe_recorder::domain::recording::{AudioChunk, CaptureSourceKind, SessionId};
use scribe_recorder::domain::recovery::{
    RecoveredAudio, RecoveredRecording, RetentionPolicy, SessionManifest,
};

/// Samples in one 100 ms frame of 16 kHz mono
pub const FRAME: usize = 1_600;

/// Capture that emits 100 ms frames starting 50 ms after opening.
///
/// With `frame_budget` set the stream goes quiet (but stays open) once that
/// many frames were sent.
#[derive(Default)]
pub struct ScriptedCapture {
    pub unsupported: Vec<CaptureSourceKind>,
    pub frame_budget: Option<usize>,
    pub opens: Arc<AtomicUsize>,
}

impl ScriptedCapture {
    pub fn without(kind: CaptureSourceKind) -> Self {
        Self {
            unsupported: vec![kind],
            ..Self::default()
        }
    }

    pub fn with_budget(frames: usize) -> Self {
        Self {
            frame_budget: Some(frames),
            ..Self::default()
        }
    }

    /// Counter of `open` calls that outlives the capture
    pub fn open_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.opens)
    }
}

#[async_trait]
impl CaptureSource for ScriptedCapture {
    fn supports(&self, kind: CaptureSourceKind) -> bool {
        !self.unsupported.contains(&kind)
    }

    async fn open(&self, _kind: CaptureSourceKind) -> Result<CaptureStream, CaptureError> {
        self.opens.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = mpsc::unbounded_channel();
        let budget = self.frame_budget;
        tokio::spawn(async move {
            let period = StdDuration::from_millis(100);
            let mut ticker = time::interval_at(Instant::now() + StdDuration::from_millis(50), period);
            let mut sent = 0;
            loop {
                ticker.tick().await;
                if budget.is_some_and(|limit| sent >= limit) {
                    if tx.is_closed() {
                        break;
                    }
                    continue;
                }
                if tx.send(CaptureEvent::Samples(vec![2000; FRAME])).is_err() {
                    break;
                }
                sent += 1;
            }
        });

        Ok(CaptureStream::new(PcmFormat::speech(), rx))
    }
}

#[derive(Default)]
struct Entry {
    manifest: Option<SessionManifest>,
    chunks: Vec<AudioChunk>,
}

/// Recovery store kept in memory
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<SessionId, Entry>>,
}

impl MemoryStore {
    pub fn chunk_count(&self, id: &SessionId) -> usize {
        self.entries
            .lock()
            .unwrap()
            .get(id)
            .map(|entry| entry.chunks.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl RecoveryStore for MemoryStore {
    async fn save(&self, manifest: &SessionManifest, chunk: &AudioChunk) -> Result<(), RecoveryError> {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries.entry(manifest.id.clone()).or_default();
        entry.manifest = Some(manifest.clone());
        entry.chunks.push(chunk.clone());
        Ok(())
    }

    async fn list_recoverable(&self) -> Result<Vec<RecoveredRecording>, RecoveryError> {
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .values()
            .filter_map(|entry| {
                let manifest = entry.manifest.as_ref()?;
                Some(RecoveredRecording {
                    id: manifest.id.clone(),
                    source: manifest.source,
                    mime_type: manifest.mime_type,
                    chunk_count: entry.chunks.len() as u32,
                    duration_ms: manifest.duration_ms,
                    created_at: manifest.created_at,
                    updated_at: Utc::now(),
                })
            })
            .collect())
    }

    async fn load(&self, id: &SessionId) -> Result<RecoveredAudio, RecoveryError> {
        let recording = self
            .list_recoverable()
            .await?
            .into_iter()
            .find(|recording| &recording.id == id)
            .ok_or_else(|| RecoveryError::NotFound(id.clone()))?;

        let (format, pcm) = {
            let entries = self.entries.lock().unwrap();
            let entry = &entries[id];
            let format = entry.manifest.as_ref().map_or(PcmFormat::speech(), |m| m.format);
            let pcm: Vec<u8> = entry.chunks.iter().flat_map(|c| c.data().to_vec()).collect();
            (format, pcm)
        };
        let bytes = wav::wrap_pcm(format, &pcm).map_err(|e| RecoveryError::Corrupt(e.to_string()))?;

        Ok(RecoveredAudio {
            audio: AudioData::new(bytes, recording.mime_type),
            recording,
        })
    }

    async fn delete(&self, id: &SessionId) -> Result<(), RecoveryError> {
        self.entries.lock().unwrap().remove(id);
        Ok(())
    }

    async fn prune(&self, _policy: &RetentionPolicy) -> Result<Vec<SessionId>, RecoveryError> {
        Ok(Vec::new())
    }
}

/// Uploader that records what it was given and fails a set number of times.
///
/// Clones share state, so a test can keep one while the coordinator owns another.
#[derive(Clone, Default)]
pub struct MockUploader {
    failures_left: Arc<AtomicUsize>,
    uploads: Arc<Mutex<Vec<UploadFile>>>,
}

impl MockUploader {
    pub fn failing(times: usize) -> Self {
        Self {
            failures_left: Arc::new(AtomicUsize::new(times)),
            ..Self::default()
        }
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    pub fn last_upload(&self) -> Option<UploadFile> {
        self.uploads.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Uploader for MockUploader {
    async fn upload(&self, file: &UploadFile) -> Result<UploadReceipt, UploadError> {
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(UploadError::RequestFailed("connection reset".to_string()));
        }

        let mut uploads = self.uploads.lock().unwrap();
        uploads.push(file.clone());
        Ok(UploadReceipt {
            transcription_id: format!("t-{}", uploads.len()),
            status: "accepted".to_string(),
        })
    }
}

pub fn ms(millis: u64) -> StdDuration {
    StdDuration::from_millis(millis)
}
