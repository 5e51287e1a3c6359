//! HTTP uploader integration tests against a mock backend

use std::time::Duration as StdDuration;

use chrono::{TimeZone, Utc};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scribe_recorder::application::ports::{UploadError, UploadFile, UploadMetadata, Uploader};
use scribe_recorder::domain::audio::{AudioData, AudioMimeType};
use scribe_recorder::domain::recording::{CaptureSourceKind, Duration};
use scribe_recorder::infrastructure::HttpUploader;

fn sample_file(title: Option<&str>) -> UploadFile {
    UploadFile {
        file_name: "standup-20261019-093000.wav".to_string(),
        audio: AudioData::new(b"RIFF....WAVEfmt ".to_vec(), AudioMimeType::Wav),
        metadata: UploadMetadata {
            title: title.map(str::to_string),
            source: CaptureSourceKind::Microphone,
            duration_seconds: 7.5,
            recorded_at: Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap(),
        },
    }
}

async fn respond_with(status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transcriptions/upload"))
        .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn upload_returns_receipt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transcriptions/upload"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_string_contains("name=\"file\"; filename=\"standup-20261019-093000.wav\""))
        .and(body_string_contains("name=\"title\""))
        .and(body_string_contains("microphone"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(serde_json::json!({"id": "t-1", "status": "queued"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let uploader = HttpUploader::new(server.uri(), "test-key");
    let receipt = uploader.upload(&sample_file(Some("Standup"))).await.unwrap();

    assert_eq!(receipt.transcription_id, "t-1");
    assert_eq!(receipt.status, "queued");
}

#[tokio::test]
async fn base_url_with_trailing_slash() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transcriptions/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 7})))
        .mount(&server)
        .await;

    let uploader = HttpUploader::new(format!("{}/", server.uri()), "test-key");
    let receipt = uploader.upload(&sample_file(None)).await.unwrap();

    assert_eq!(receipt.transcription_id, "7");
    assert_eq!(receipt.status, "accepted");
}

#[tokio::test]
async fn status_codes_map_to_errors() {
    let cases = [
        (401, UploadError::Unauthorized),
        (402, UploadError::QuotaExceeded),
        (413, UploadError::PayloadTooLarge),
        (429, UploadError::RateLimited),
    ];

    for (status, expected) in cases {
        let server = respond_with(status).await;
        let uploader = HttpUploader::new(server.uri(), "test-key");
        let err = uploader.upload(&sample_file(None)).await.unwrap_err();
        assert_eq!(err, expected, "status {}", status);
    }
}

#[tokio::test]
async fn server_error_keeps_body() {
    let server = respond_with(500).await;
    let uploader = HttpUploader::new(server.uri(), "test-key");

    match uploader.upload(&sample_file(None)).await {
        Err(UploadError::ApiError(message)) => {
            assert!(message.contains("500"));
            assert!(message.contains("nope"));
        }
        other => panic!("expected ApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn malformed_response_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transcriptions/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;

    let uploader = HttpUploader::new(server.uri(), "test-key");
    let err = uploader.upload(&sample_file(None)).await.unwrap_err();

    assert!(matches!(err, UploadError::ParseError(_)));
}

#[tokio::test]
async fn empty_api_key_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let uploader = HttpUploader::new(server.uri(), "  ");
    let err = uploader.upload(&sample_file(None)).await.unwrap_err();

    assert_eq!(err, UploadError::MissingApiKey);
}

#[tokio::test]
async fn slow_backend_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"id": "late"}))
                .set_delay(StdDuration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let uploader =
        HttpUploader::new(server.uri(), "test-key").with_timeout(Duration::from_millis(200));
    let err = uploader.upload(&sample_file(None)).await.unwrap_err();

    assert!(matches!(err, UploadError::RequestFailed(_)));
}
