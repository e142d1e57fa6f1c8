//! Integration tests for the HTTP submission client.
//!
//! Each test runs a mock synthesis service on an ephemeral port and drives
//! `HttpSubmissionClient` against it over real sockets.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tryon_client::{
    Config, HttpSubmissionClient, ImageInput, ImageSlot, SubmissionClient, SubmissionError,
    TryOnError, TryOnResult, MAX_FILE_SIZE, TRY_ON_PATH,
};

const RESULT_URL: &str = "https://cdn.example.com/results/look.jpg";

/// One multipart field as the mock service saw it.
#[derive(Debug, Clone)]
struct ReceivedPart {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    size: usize,
}

/// Records what reached the mock service.
#[derive(Debug, Default)]
struct Spy {
    calls: AtomicUsize,
    body_bytes: AtomicUsize,
    parts: Mutex<Vec<ReceivedPart>>,
}

impl Spy {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Serves `router` on an ephemeral port and returns its base URL.
async fn spawn_mock(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local addr");

    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });

    format!("http://{addr}")
}

/// Builds a client for `base_url` with short timeouts.
fn client_for(base_url: &str, timeout_secs: u64) -> HttpSubmissionClient {
    let config = Config {
        base_url: base_url.to_string(),
        request_timeout_secs: timeout_secs,
        connect_timeout_secs: 1,
        ..Config::default()
    };
    HttpSubmissionClient::new(config).expect("Failed to build client")
}

fn png(name: &str, size: usize) -> ImageInput {
    ImageInput::from_bytes(name, "image/png", vec![0x42; size])
}

fn jpeg(name: &str, size: usize) -> ImageInput {
    ImageInput::from_bytes(name, "image/jpeg", vec![0x24; size])
}

/// Mock that drains the raw upload and answers with a valid result.
fn accepting_service(spy: Arc<Spy>) -> Router {
    async fn accept(State(spy): State<Arc<Spy>>, body: Body) -> impl IntoResponse {
        spy.calls.fetch_add(1, Ordering::SeqCst);
        let bytes = axum::body::to_bytes(body, usize::MAX)
            .await
            .expect("Failed to read upload");
        spy.body_bytes.store(bytes.len(), Ordering::SeqCst);
        Json(json!({ "imageUrl": RESULT_URL }))
    }

    Router::new()
        .route(TRY_ON_PATH, post(accept))
        .layer(DefaultBodyLimit::disable())
        .with_state(spy)
}

/// Mock that always answers with the given status and body.
fn fixed_service(spy: Arc<Spy>, status: StatusCode, body: &'static str) -> Router {
    Router::new()
        .route(
            TRY_ON_PATH,
            post(move |State(spy): State<Arc<Spy>>| async move {
                spy.calls.fetch_add(1, Ordering::SeqCst);
                (status, body)
            }),
        )
        .with_state(spy)
}

// ============================================================================
// Success path
// ============================================================================

#[tokio::test]
async fn test_valid_submission_returns_image_url() {
    let spy = Arc::new(Spy::default());
    let base_url = spawn_mock(accepting_service(Arc::clone(&spy))).await;
    let client = client_for(&base_url, 10);

    let result = client
        .submit_try_on(&jpeg("me.jpg", 2048), &png("coat.png", 4096))
        .await
        .expect("Submission should succeed");

    assert_eq!(result.image_url, RESULT_URL);
    assert_eq!(spy.calls(), 1);
}

#[tokio::test]
async fn test_multipart_carries_both_images_with_metadata() {
    async fn capture(State(spy): State<Arc<Spy>>, mut multipart: Multipart) -> impl IntoResponse {
        spy.calls.fetch_add(1, Ordering::SeqCst);
        while let Some(field) = multipart.next_field().await.expect("Bad multipart") {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let size = field.bytes().await.expect("Bad field").len();
            spy.parts.lock().expect("poisoned").push(ReceivedPart {
                name,
                file_name,
                content_type,
                size,
            });
        }
        Json(json!({ "imageUrl": RESULT_URL }))
    }

    let spy = Arc::new(Spy::default());
    let router = Router::new()
        .route(TRY_ON_PATH, post(capture))
        .with_state(Arc::clone(&spy));
    let base_url = spawn_mock(router).await;
    let client = client_for(&base_url, 10);

    client
        .submit_try_on(&jpeg("me.jpg", 300), &png("coat.png", 500))
        .await
        .expect("Submission should succeed");

    let parts = spy.parts.lock().expect("poisoned").clone();
    assert_eq!(parts.len(), 2);

    let portrait = parts
        .iter()
        .find(|p| p.name == "portrait")
        .expect("portrait field missing");
    assert_eq!(portrait.file_name.as_deref(), Some("me.jpg"));
    assert_eq!(portrait.content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(portrait.size, 300);

    let clothing = parts
        .iter()
        .find(|p| p.name == "clothing")
        .expect("clothing field missing");
    assert_eq!(clothing.file_name.as_deref(), Some("coat.png"));
    assert_eq!(clothing.content_type.as_deref(), Some("image/png"));
    assert_eq!(clothing.size, 500);
}

#[tokio::test]
async fn test_file_exactly_at_limit_is_uploaded() {
    let spy = Arc::new(Spy::default());
    let base_url = spawn_mock(accepting_service(Arc::clone(&spy))).await;
    let client = client_for(&base_url, 30);

    let at_limit = usize::try_from(MAX_FILE_SIZE).expect("limit fits in usize");
    let result = client
        .submit_try_on(&png("big.png", at_limit), &png("coat.png", 16))
        .await;

    assert!(result.is_ok(), "got {result:?}");
    assert_eq!(spy.calls(), 1);
    assert!(spy.body_bytes.load(Ordering::SeqCst) > at_limit);
}

// ============================================================================
// Validation happens before any network traffic
// ============================================================================

#[tokio::test]
async fn test_non_image_input_is_rejected_without_request() {
    let spy = Arc::new(Spy::default());
    let base_url = spawn_mock(accepting_service(Arc::clone(&spy))).await;
    let client = client_for(&base_url, 10);

    let notes = ImageInput::from_bytes("notes.txt", "text/plain", b"hello".to_vec());
    let err = client
        .submit_try_on(&jpeg("me.jpg", 64), &notes)
        .await
        .expect_err("Text input should be rejected");

    assert_eq!(
        err,
        SubmissionError::InvalidFormat {
            slot: ImageSlot::Clothing,
            media_type: "text/plain".to_string(),
        }
    );
    assert_eq!(
        err.to_string(),
        "Invalid file format. Please upload an image file."
    );
    assert_eq!(spy.calls(), 0);
}

#[tokio::test]
async fn test_oversized_input_is_rejected_without_request() {
    let spy = Arc::new(Spy::default());
    let base_url = spawn_mock(accepting_service(Arc::clone(&spy))).await;
    let client = client_for(&base_url, 10);

    let over_limit = usize::try_from(MAX_FILE_SIZE).expect("limit fits in usize") + 1;
    let err = client
        .submit_try_on(&png("huge.png", over_limit), &png("coat.png", 16))
        .await
        .expect_err("Oversized input should be rejected");

    assert_eq!(
        err,
        SubmissionError::FileTooLarge {
            slot: ImageSlot::Portrait,
            size_bytes: 10_485_761,
        }
    );
    assert_eq!(
        err.to_string(),
        "File size too large. Please upload an image smaller than 10MB."
    );
    assert_eq!(spy.calls(), 0);
}

#[tokio::test]
async fn test_portrait_is_validated_before_clothing() {
    let spy = Arc::new(Spy::default());
    let base_url = spawn_mock(accepting_service(Arc::clone(&spy))).await;
    let client = client_for(&base_url, 10);

    let pdf = ImageInput::from_bytes("me.pdf", "application/pdf", vec![1; 8]);
    let txt = ImageInput::from_bytes("coat.txt", "text/plain", vec![1; 8]);
    let err = client
        .submit_try_on(&pdf, &txt)
        .await
        .expect_err("Both inputs are invalid");

    assert!(matches!(
        err,
        SubmissionError::InvalidFormat {
            slot: ImageSlot::Portrait,
            ..
        }
    ));
    assert_eq!(spy.calls(), 0);
}

// ============================================================================
// Service failures
// ============================================================================

#[tokio::test]
async fn test_server_error_carries_status_and_body() {
    let spy = Arc::new(Spy::default());
    let router = fixed_service(
        Arc::clone(&spy),
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal error",
    );
    let base_url = spawn_mock(router).await;
    let client = client_for(&base_url, 10);

    let err = client
        .submit_try_on(&jpeg("me.jpg", 64), &png("coat.png", 64))
        .await
        .expect_err("500 should fail");

    assert_eq!(err, SubmissionError::server(500, "internal error"));
    assert_eq!(err.status_code(), Some(500));
    assert_eq!(spy.calls(), 1);
}

#[tokio::test]
async fn test_empty_error_body_uses_status_text() {
    let spy = Arc::new(Spy::default());
    let router = fixed_service(Arc::clone(&spy), StatusCode::SERVICE_UNAVAILABLE, "");
    let base_url = spawn_mock(router).await;
    let client = client_for(&base_url, 10);

    let err = client
        .submit_try_on(&jpeg("me.jpg", 64), &png("coat.png", 64))
        .await
        .expect_err("503 should fail");

    assert_eq!(
        err,
        SubmissionError::server(503, "HTTP 503: Service Unavailable")
    );
}

#[tokio::test]
async fn test_success_without_image_url_is_malformed() {
    let spy = Arc::new(Spy::default());
    let router = fixed_service(Arc::clone(&spy), StatusCode::OK, "{}");
    let base_url = spawn_mock(router).await;
    let client = client_for(&base_url, 10);

    let err = client
        .submit_try_on(&jpeg("me.jpg", 64), &png("coat.png", 64))
        .await
        .expect_err("Missing imageUrl should fail");

    assert_eq!(err, SubmissionError::MalformedResponse);
    assert_eq!(
        err.to_string(),
        "Invalid response from server: missing image URL"
    );
}

#[tokio::test]
async fn test_success_with_non_json_body_is_unknown_error() {
    let spy = Arc::new(Spy::default());
    let router = fixed_service(Arc::clone(&spy), StatusCode::OK, "<html>ok</html>");
    let base_url = spawn_mock(router).await;
    let client = client_for(&base_url, 10);

    let err = client
        .submit_try_on(&jpeg("me.jpg", 64), &png("coat.png", 64))
        .await
        .expect_err("Non-JSON body should fail");

    assert!(matches!(err, SubmissionError::UnknownError { .. }), "got {err:?}");
}

// ============================================================================
// Transport failures
// ============================================================================

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
        listener.local_addr().expect("Failed to get local addr").port()
    };
    let client = client_for(&format!("http://127.0.0.1:{port}"), 5);

    let err = client
        .submit_try_on(&jpeg("me.jpg", 64), &png("coat.png", 64))
        .await
        .expect_err("Nothing is listening");

    assert_eq!(err, SubmissionError::network());
    assert_eq!(
        err.to_string(),
        "Network error: Unable to connect to server. Please check your connection."
    );
}

#[tokio::test]
async fn test_slow_service_times_out_as_network_error() {
    async fn stall(body: Body) -> impl IntoResponse {
        let _ = axum::body::to_bytes(body, usize::MAX).await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        Json(json!({ "imageUrl": RESULT_URL }))
    }

    let router = Router::new().route(TRY_ON_PATH, post(stall));
    let base_url = spawn_mock(router).await;
    let client = client_for(&base_url, 1);

    let err = client
        .submit_try_on(&jpeg("me.jpg", 64), &png("coat.png", 64))
        .await
        .expect_err("Request should time out");

    assert_eq!(err, SubmissionError::timeout());
    assert!(matches!(err, SubmissionError::NetworkError { .. }));
}

// ============================================================================
// Result download
// ============================================================================

#[tokio::test]
async fn test_download_resolves_relative_result_url() {
    let router = Router::new().route(
        "/results/look.png",
        get(|| async { (StatusCode::OK, vec![7_u8; 1234]) }),
    );
    let base_url = spawn_mock(router).await;
    let client = client_for(&base_url, 10);

    let dir = std::env::temp_dir().join(format!("tryon-download-{}", std::process::id()));
    let destination = dir.join("nested").join("look.png");

    let written = client
        .download_result(&TryOnResult::new("/results/look.png"), &destination)
        .await
        .expect("Download should succeed");

    assert_eq!(written, 1234);
    let saved = tokio::fs::read(&destination).await.expect("File not written");
    assert_eq!(saved.len(), 1234);

    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[tokio::test]
async fn test_download_missing_result_is_server_error() {
    let router = Router::new();
    let base_url = spawn_mock(router).await;
    let client = client_for(&base_url, 10);

    let destination = std::env::temp_dir().join("tryon-never-written.png");
    let err = client
        .download_result(&TryOnResult::new("/results/gone.png"), &destination)
        .await
        .expect_err("404 should fail");

    match err {
        TryOnError::Submission(SubmissionError::ServerError { status, .. }) => {
            assert_eq!(status, 404);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
