//! Ordered background persistence of recorded chunks

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::domain::recording::AudioChunk;
use crate::domain::recovery::SessionManifest;

use super::ports::RecoveryStore;

#[derive(Debug)]
enum PersistenceMessage {
    Save {
        manifest: SessionManifest,
        chunk: AudioChunk,
    },
    Flush(oneshot::Sender<()>),
}

/// Cheap handle for queueing chunk writes.
///
/// Writes are applied one at a time in the order they were queued, so a
/// session's chunks always land in sequence. Queueing never waits on the
/// store.
#[derive(Debug, Clone)]
pub struct PersistenceHandle {
    tx: mpsc::UnboundedSender<PersistenceMessage>,
    failures: Arc<AtomicU64>,
}

impl PersistenceHandle {
    /// Queue a chunk for durable storage
    pub fn save(&self, manifest: SessionManifest, chunk: AudioChunk) {
        if self
            .tx
            .send(PersistenceMessage::Save { manifest, chunk })
            .is_err()
        {
            warn!("Persistence writer is gone, chunk kept in memory only");
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Wait until every write queued so far has been applied
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(PersistenceMessage::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }

    /// Number of chunks that could not be persisted
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

/// Single task that drains the queue into a [`RecoveryStore`]
pub struct PersistenceWriter<S: RecoveryStore> {
    store: Arc<S>,
    rx: mpsc::UnboundedReceiver<PersistenceMessage>,
    failures: Arc<AtomicU64>,
}

impl<S: RecoveryStore + 'static> PersistenceWriter<S> {
    pub fn new(store: Arc<S>) -> (PersistenceHandle, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let failures = Arc::new(AtomicU64::new(0));

        let handle = PersistenceHandle {
            tx,
            failures: Arc::clone(&failures),
        };
        let writer = Self {
            store,
            rx,
            failures,
        };

        (handle, writer)
    }

    /// Create the writer and run it on the current runtime
    pub fn spawn(store: Arc<S>) -> PersistenceHandle {
        let (handle, writer) = Self::new(store);
        tokio::spawn(writer.run());
        handle
    }

    /// Process messages until every handle has been dropped
    pub async fn run(mut self) {
        debug!("Persistence writer started");

        while let Some(msg) = self.rx.recv().await {
            match msg {
                PersistenceMessage::Save { manifest, chunk } => {
                    if let Err(e) = self.store.save(&manifest, &chunk).await {
                        self.failures.fetch_add(1, Ordering::Relaxed);
                        warn!(
                            session = %manifest.id,
                            sequence = chunk.sequence(),
                            "Failed to persist chunk, continuing in memory: {}",
                            e
                        );
                    }
                }
                PersistenceMessage::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }

        debug!("Persistence writer stopped");
    }
}
