//! End-to-end recording scenarios across recorder, recovery store and upload

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::Utc;
use tokio::time::sleep;

use scribe_recorder::application::ports::{CaptureError, RecoveryStore, UploadError};
use scribe_recorder::application::{
    ChunkedRecorder, RecorderConfig, RecorderError, RecoveryService, UploadCoordinator,
    UploadCoordinatorError,
};
use scribe_recorder::domain::audio::{wav, AudioMimeType, PcmFormat};
use scribe_recorder::domain::recording::{
    AudioChunk, CaptureSourceKind, RecorderState, SessionId, Transition,
};
use scribe_recorder::domain::recovery::{RecoveryPrompts, SessionManifest};
use scribe_recorder::infrastructure::FsRecoveryStore;

use common::{ms, MemoryStore, MockUploader, ScriptedCapture, FRAME};

fn recorder_with<S: RecoveryStore + 'static>(
    capture: ScriptedCapture,
    store: &Arc<S>,
) -> ChunkedRecorder<ScriptedCapture, S> {
    ChunkedRecorder::new(capture, Arc::clone(store), RecorderConfig::default())
}

/// Write `seconds` one-second chunks straight into a store
async fn seed_session<S: RecoveryStore>(store: &S, seconds: u32) -> SessionId {
    let id = SessionId::generate();
    let format = PcmFormat::speech();
    for sequence in 0..seconds {
        let data = wav::encode_samples(&vec![500; format.sample_rate as usize]);

        let manifest = SessionManifest {
            id: id.clone(),
            source: CaptureSourceKind::Microphone,
            mime_type: AudioMimeType::Wav,
            format,
            created_at: Utc::now(),
            duration_ms: (sequence as u64 + 1) * 1000,
        };
        let chunk = AudioChunk::new(sequence, sequence as u64 * 1000, data);
        store.save(&manifest, &chunk).await.unwrap();
    }
    id
}

#[tokio::test(start_paused = true)]
async fn pause_resume_then_upload_leaves_nothing_to_recover() {
    let store = Arc::new(MemoryStore::default());
    let recorder = recorder_with(ScriptedCapture::default(), &store);
    let uploader = MockUploader::default();
    let coordinator = UploadCoordinator::new(uploader.clone(), Arc::clone(&store));

    recorder.start(CaptureSourceKind::Microphone).await.unwrap();
    let id = recorder.session_id().await;

    // Stay clear of tick instants
    sleep(ms(20)).await;
    for expected in 1..=5 {
        sleep(ms(1000)).await;
        assert_eq!(recorder.chunk_count().await, expected);
    }

    assert_eq!(recorder.pause().await.unwrap(), Transition::Applied);
    sleep(ms(3000)).await;
    assert_eq!(recorder.chunk_count().await, 5);

    assert_eq!(recorder.resume().await.unwrap(), Transition::Applied);
    sleep(ms(2010)).await;
    assert_eq!(recorder.stop().await.unwrap(), Transition::Applied);
    assert_eq!(recorder.chunk_count().await, 7);

    recorder.flush().await;
    assert_eq!(store.chunk_count(&id), 7);

    let receipt = coordinator.upload_finished(&recorder, Some("Standup")).await.unwrap();
    assert_eq!(receipt.transcription_id, "t-1");
    assert_eq!(recorder.state(), RecorderState::Idle);
    assert!(store.list_recoverable().await.unwrap().is_empty());

    // Seventy 100 ms frames, paused time excluded
    let upload = uploader.last_upload().unwrap();
    let audio_len = wav::duration(upload.audio.data()).unwrap();
    assert_eq!(audio_len, ms(7000));
    assert!((upload.metadata.duration_seconds - 7.0).abs() < 0.1);
    assert_eq!(upload.metadata.title.as_deref(), Some("Standup"));
    assert!(upload.file_name.starts_with("standup-"));
}

#[tokio::test(start_paused = true)]
async fn abrupt_termination_leaves_recoverable_session() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FsRecoveryStore::with_root(dir.path()));

    // Three seconds of audio, then nothing
    let recorder = recorder_with(ScriptedCapture::with_budget(30), &store);
    recorder.start(CaptureSourceKind::Microphone).await.unwrap();
    let id = recorder.session_id().await;

    sleep(ms(3020)).await;
    assert_eq!(recorder.chunk_count().await, 3);
    recorder.flush().await;

    // No stop: the process just goes away
    drop(recorder);

    let reopened = FsRecoveryStore::with_root(dir.path());
    let recoverable = reopened.list_recoverable().await.unwrap();
    assert_eq!(recoverable.len(), 1);
    assert_eq!(recoverable[0].id, id);
    assert_eq!(recoverable[0].chunk_count, 3);
    assert_eq!(recoverable[0].mime_type, AudioMimeType::Wav);

    let recovered = reopened.load(&id).await.unwrap();
    assert_eq!(wav::duration(recovered.audio.data()).unwrap(), ms(3000));
}

#[tokio::test]
async fn unsupported_tab_audio_fails_without_opening() {
    let capture = ScriptedCapture::without(CaptureSourceKind::TabAudio);
    let opens = capture.open_counter();
    let store = Arc::new(MemoryStore::default());
    let recorder = recorder_with(capture, &store);

    let result = recorder.start(CaptureSourceKind::TabAudio).await;

    assert!(matches!(
        result,
        Err(RecorderError::Capture(CaptureError::SourceUnavailable(_)))
    ));
    assert_eq!(recorder.state(), RecorderState::Idle);
    assert!(matches!(
        recorder.last_error(),
        Some(CaptureError::SourceUnavailable(_))
    ));
    // No permission prompt was ever shown
    assert_eq!(opens.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unsupported_source_does_not_block_other_sources() {
    let capture = ScriptedCapture::without(CaptureSourceKind::TabAudio);
    let opens = capture.open_counter();
    let store = Arc::new(MemoryStore::default());
    let recorder = recorder_with(capture, &store);

    assert!(recorder.start(CaptureSourceKind::TabAudio).await.is_err());
    // The microphone still works afterwards
    recorder.start(CaptureSourceKind::Microphone).await.unwrap();
    assert_eq!(opens.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.state(), RecorderState::Recording);
    recorder.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn stop_is_a_no_op_outside_recording() {
    let store = Arc::new(MemoryStore::default());
    let recorder = recorder_with(ScriptedCapture::default(), &store);

    assert_eq!(recorder.stop().await.unwrap(), Transition::Ignored);
    assert_eq!(recorder.state(), RecorderState::Idle);

    recorder.start(CaptureSourceKind::Microphone).await.unwrap();
    sleep(ms(520)).await;
    recorder.pause().await.unwrap();
    assert_eq!(recorder.stop().await.unwrap(), Transition::Applied);
    assert_eq!(recorder.stop().await.unwrap(), Transition::Ignored);
    assert_eq!(recorder.state(), RecorderState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn every_chunk_is_durable_before_the_next() {
    let store = Arc::new(MemoryStore::default());
    let recorder = recorder_with(ScriptedCapture::default(), &store);
    recorder.start(CaptureSourceKind::Microphone).await.unwrap();
    let id = recorder.session_id().await;

    sleep(ms(20)).await;
    for expected in 1..=4 {
        sleep(ms(1000)).await;
        assert_eq!(store.chunk_count(&id), expected);
    }
    recorder.stop().await.unwrap();
    recorder.flush().await;
    assert_eq!(store.chunk_count(&id), recorder.chunk_count().await);
}

#[tokio::test(start_paused = true)]
async fn failed_upload_keeps_recording_for_retry() {
    let store = Arc::new(MemoryStore::default());
    let recorder = recorder_with(ScriptedCapture::default(), &store);
    let uploader = MockUploader::failing(1);
    let coordinator = UploadCoordinator::new(uploader.clone(), Arc::clone(&store));

    recorder.start(CaptureSourceKind::Microphone).await.unwrap();
    sleep(ms(2020)).await;
    recorder.stop().await.unwrap();

    let first = coordinator.upload_finished(&recorder, None).await;
    assert!(matches!(
        first,
        Err(UploadCoordinatorError::Upload(UploadError::RequestFailed(_)))
    ));
    assert_eq!(recorder.state(), RecorderState::Stopped);
    assert_eq!(store.list_recoverable().await.unwrap().len(), 1);

    coordinator.upload_finished(&recorder, None).await.unwrap();
    assert_eq!(uploader.upload_count(), 1);
    assert!(store.list_recoverable().await.unwrap().is_empty());
}

#[tokio::test]
async fn recovered_upload_removes_only_that_session() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FsRecoveryStore::with_root(dir.path()));
    let uploaded = seed_session(store.as_ref(), 2).await;
    let kept = seed_session(store.as_ref(), 1).await;

    let uploader = MockUploader::default();
    let coordinator = UploadCoordinator::new(uploader.clone(), Arc::clone(&store));
    coordinator.upload_recovered(&uploaded, None).await.unwrap();

    let remaining: Vec<SessionId> = store
        .list_recoverable()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(remaining, vec![kept]);

    let upload = uploader.last_upload().unwrap();
    assert_eq!(wav::duration(upload.audio.data()).unwrap(), ms(2000));
    assert!((upload.metadata.duration_seconds - 2.0).abs() < 1e-9);
}

#[tokio::test]
async fn discarding_recovered_session_leaves_others() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FsRecoveryStore::with_root(dir.path()));
    let first = seed_session(store.as_ref(), 1).await;
    let second = seed_session(store.as_ref(), 2).await;
    let service = RecoveryService::new(Arc::clone(&store));

    service.discard(&first).await.unwrap();

    let remaining = service.list().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, second);
    assert_eq!(remaining[0].chunk_count, 2);
}

#[tokio::test]
async fn recoverable_sessions_are_offered_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FsRecoveryStore::with_root(dir.path()));
    seed_session(store.as_ref(), 1).await;
    let service = RecoveryService::new(Arc::clone(&store));
    let mut prompts = RecoveryPrompts::new();

    assert_eq!(service.offer(&mut prompts).await.unwrap().len(), 1);
    assert!(service.offer(&mut prompts).await.unwrap().is_empty());

    // A fresh run offers it again
    let mut next_run = RecoveryPrompts::new();
    assert_eq!(service.offer(&mut next_run).await.unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn recorded_audio_duration_matches_tracked_time() {
    let store = Arc::new(MemoryStore::default());
    let recorder = recorder_with(ScriptedCapture::default(), &store);
    recorder.start(CaptureSourceKind::Microphone).await.unwrap();

    sleep(ms(1520)).await;
    recorder.pause().await.unwrap();
    sleep(ms(4000)).await;
    recorder.resume().await.unwrap();
    sleep(ms(1230)).await;
    recorder.stop().await.unwrap();

    let finished = recorder.finished().await.unwrap();
    let audio_len = wav::duration(finished.audio.data()).unwrap();
    let tracked = finished.duration;

    // Within one capture frame of the stopwatch
    let frame = ms((FRAME as u64 * 1000) / PcmFormat::speech().sample_rate as u64);
    let diff = if audio_len > tracked {
        audio_len - tracked
    } else {
        tracked - audio_len
    };
    assert!(diff <= frame, "audio {:?} vs tracked {:?}", audio_len, tracked);
    assert_eq!(tracked, ms(2750));
}
