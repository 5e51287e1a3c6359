//! Filesystem recovery store adapter
//!
//! Layout:
//!
//! ```text
//! <root>/<session-id>/manifest.json
//! <root>/<session-id>/000000.chunk
//! <root>/<session-id>/000001.chunk
//! ```
//!
//! Every file is written to a temporary name and renamed into place, so a
//! crash leaves either the previous or the new version, never a torn file.
//! Chunks are raw PCM; the manifest records their format and the WAV
//! header is rebuilt on load.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::application::ports::{RecoveryError, RecoveryStore};
use crate::domain::audio::{wav, AudioData, AudioMimeType, PcmFormat};
use crate::infrastructure::config::default_recovery_dir;
use crate::domain::recording::{AudioChunk, CaptureSourceKind, SessionId};
use crate::domain::recovery::{
    RecoveredAudio, RecoveredRecording, RetentionPolicy, SessionManifest,
};

const MANIFEST_FILE: &str = "manifest.json";
const CHUNK_EXTENSION: &str = "chunk";

/// On-disk manifest
#[derive(Debug, Serialize, Deserialize)]
struct ManifestFile {
    id: SessionId,
    source: String,
    mime_type: String,
    sample_rate: u32,
    channels: u16,
    chunk_count: u32,
    duration_ms: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ManifestFile {
    fn from_manifest(manifest: &SessionManifest, chunk_count: u32) -> Self {
        Self {
            id: manifest.id.clone(),
            source: manifest.source.as_str().to_string(),
            mime_type: manifest.mime_type.as_str().to_string(),
            sample_rate: manifest.format.sample_rate,
            channels: manifest.format.channels,
            chunk_count,
            duration_ms: manifest.duration_ms,
            created_at: manifest.created_at,
            updated_at: Utc::now(),
        }
    }

    fn format(&self) -> Result<PcmFormat, RecoveryError> {
        if self.sample_rate == 0 || self.channels == 0 {
            return Err(RecoveryError::Corrupt(format!(
                "{}: invalid PCM format {} Hz x {}",
                self.id, self.sample_rate, self.channels
            )));
        }
        Ok(PcmFormat::new(self.sample_rate, self.channels))
    }

    fn into_recording(self, chunk_count: u32) -> Result<RecoveredRecording, RecoveryError> {
        let source = self
            .source
            .parse::<CaptureSourceKind>()
            .map_err(|e| RecoveryError::Corrupt(e.to_string()))?;
        let mime_type = self
            .mime_type
            .parse::<AudioMimeType>()
            .map_err(|e| RecoveryError::Corrupt(e.to_string()))?;

        Ok(RecoveredRecording {
            id: self.id,
            source,
            mime_type,
            chunk_count,
            duration_ms: self.duration_ms,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Recovery store keeping one directory per session
pub struct FsRecoveryStore {
    root: PathBuf,
}

impl FsRecoveryStore {
    /// Create a store rooted at `$XDG_DATA_HOME/scribe-recorder/recovery`
    pub fn new() -> Self {
        Self::with_root(default_recovery_dir())
    }

    /// Create with custom root directory
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn session_dir(&self, id: &SessionId) -> PathBuf {
        self.root.join(id.as_str())
    }

    fn chunk_file_name(sequence: u32) -> String {
        format!("{:06}.{}", sequence, CHUNK_EXTENSION)
    }

    /// Write `bytes` to `path` via a synced temporary file and rename
    async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let tmp = path.with_extension("tmp");
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp, path).await
    }

    async fn read_manifest(dir: &Path) -> Result<ManifestFile, RecoveryError> {
        let content = fs::read(dir.join(MANIFEST_FILE))
            .await
            .map_err(|e| RecoveryError::ReadFailed(format!("{}: {}", dir.display(), e)))?;
        serde_json::from_slice(&content)
            .map_err(|e| RecoveryError::Corrupt(format!("{}: {}", dir.display(), e)))
    }

    /// Chunk files present on disk, in sequence order.
    ///
    /// A chunk whose write failed leaves a hole in the sequence; the
    /// surrounding chunks are still returned.
    async fn chunk_paths(dir: &Path) -> Result<Vec<PathBuf>, RecoveryError> {
        let read_failed = |e: std::io::Error| RecoveryError::ReadFailed(format!("{}: {}", dir.display(), e));

        let mut entries = fs::read_dir(dir).await.map_err(read_failed)?;
        let mut chunks: Vec<(u32, PathBuf)> = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(read_failed)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(CHUNK_EXTENSION) {
                continue;
            }
            if let Some(sequence) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u32>().ok())
            {
                chunks.push((sequence, path));
            }
        }
        chunks.sort_by_key(|(sequence, _)| *sequence);

        if let Some((last, _)) = chunks.last() {
            let missing = (*last as usize + 1).saturating_sub(chunks.len());
            if missing > 0 {
                warn!(
                    dir = %dir.display(),
                    found = chunks.len(),
                    missing,
                    "Chunk sequence has gaps, reassembling what was persisted"
                );
            }
        }

        Ok(chunks.into_iter().map(|(_, path)| path).collect())
    }

    /// Most recent modification time of a session directory or anything in it
    async fn last_write(dir: &Path) -> Option<DateTime<Utc>> {
        let mut latest: SystemTime = fs::metadata(dir).await.ok()?.modified().ok()?;
        if let Ok(mut entries) = fs::read_dir(dir).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                if let Ok(modified) = entry.metadata().await.and_then(|m| m.modified()) {
                    latest = latest.max(modified);
                }
            }
        }
        Some(latest.into())
    }

    async fn read_recording(dir: &Path) -> Result<RecoveredRecording, RecoveryError> {
        let manifest = Self::read_manifest(dir).await?;
        let chunk_count = Self::chunk_paths(dir).await?.len() as u32;
        manifest.into_recording(chunk_count)
    }

    /// Directories under the root named like a session
    async fn session_dirs(&self) -> Result<Vec<PathBuf>, RecoveryError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(RecoveryError::ReadFailed(format!(
                    "{}: {}",
                    self.root.display(),
                    e
                )))
            }
        };

        let mut dirs = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| RecoveryError::ReadFailed(e.to_string()))?
        {
            let path = entry.path();
            let is_session = path.is_dir()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.parse::<SessionId>().is_ok());
            if is_session {
                dirs.push(path);
            }
        }

        Ok(dirs)
    }

    /// Every readable session directory, including empty ones
    async fn all_recordings(&self) -> Result<Vec<RecoveredRecording>, RecoveryError> {
        let mut recordings = Vec::new();
        for dir in self.session_dirs().await? {
            match Self::read_recording(&dir).await {
                Ok(recording) => recordings.push(recording),
                Err(e) => warn!("Skipping unreadable recovery entry: {}", e),
            }
        }
        Ok(recordings)
    }
}

impl Default for FsRecoveryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecoveryStore for FsRecoveryStore {
    async fn save(
        &self,
        manifest: &SessionManifest,
        chunk: &AudioChunk,
    ) -> Result<(), RecoveryError> {
        let failed = |e: std::io::Error| RecoveryError::PersistenceFailure(e.to_string());
        let dir = self.session_dir(&manifest.id);
        fs::create_dir_all(&dir).await.map_err(failed)?;

        Self::write_atomic(&dir.join(Self::chunk_file_name(chunk.sequence())), chunk.data())
            .await
            .map_err(failed)?;

        let file = ManifestFile::from_manifest(manifest, chunk.sequence() + 1);
        let json = serde_json::to_vec_pretty(&file)
            .map_err(|e| RecoveryError::PersistenceFailure(e.to_string()))?;
        Self::write_atomic(&dir.join(MANIFEST_FILE), &json)
            .await
            .map_err(failed)?;

        debug!(
            session = %manifest.id,
            sequence = chunk.sequence(),
            bytes = chunk.len(),
            "Chunk persisted"
        );
        Ok(())
    }

    async fn list_recoverable(&self) -> Result<Vec<RecoveredRecording>, RecoveryError> {
        let mut recordings: Vec<_> = self
            .all_recordings()
            .await?
            .into_iter()
            .filter(|r| r.chunk_count > 0)
            .collect();
        recordings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(recordings)
    }

    async fn load(&self, id: &SessionId) -> Result<RecoveredAudio, RecoveryError> {
        let dir = self.session_dir(id);
        if !dir.is_dir() {
            return Err(RecoveryError::NotFound(id.clone()));
        }

        let manifest = Self::read_manifest(&dir).await?;
        let paths = Self::chunk_paths(&dir).await?;
        if paths.is_empty() {
            return Err(RecoveryError::NotFound(id.clone()));
        }

        let mut pcm = Vec::new();
        for path in &paths {
            let data = fs::read(path)
                .await
                .map_err(|e| RecoveryError::ReadFailed(format!("{}: {}", path.display(), e)))?;
            pcm.extend_from_slice(&data);
        }

        let format = manifest.format()?;
        let recording = manifest.into_recording(paths.len() as u32)?;
        let bytes = match recording.mime_type {
            AudioMimeType::Wav => {
                wav::wrap_pcm(format, &pcm).map_err(|e| RecoveryError::Corrupt(e.to_string()))?
            }
            _ => pcm,
        };

        Ok(RecoveredAudio {
            audio: AudioData::new(bytes, recording.mime_type),
            recording,
        })
    }

    async fn delete(&self, id: &SessionId) -> Result<(), RecoveryError> {
        match fs::remove_dir_all(self.session_dir(id)).await {
            Ok(()) => {
                debug!(session = %id, "Recovery entry deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RecoveryError::PersistenceFailure(e.to_string())),
        }
    }

    async fn prune(&self, policy: &RetentionPolicy) -> Result<Vec<SessionId>, RecoveryError> {
        let now = Utc::now();
        let mut removed = Vec::new();

        for dir in self.session_dirs().await? {
            let (id, expired) = match Self::read_recording(&dir).await {
                Ok(recording) => {
                    let expired = policy.is_expired(&recording, now);
                    (recording.id, expired)
                }
                // Without a manifest, age by the files themselves
                Err(_) => {
                    let Some(id) = dir
                        .file_name()
                        .and_then(|n| n.to_str())
                        .and_then(|n| n.parse::<SessionId>().ok())
                    else {
                        continue;
                    };
                    let expired = Self::last_write(&dir)
                        .await
                        .is_some_and(|at| policy.is_stale(at, now));
                    (id, expired)
                }
            };

            if expired {
                self.delete(&id).await?;
                removed.push(id);
            }
        }

        Ok(removed)
    }
}
