//! Integration test: content endpoints

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use predictia::content::{ContentConfig, GenerationRequest, TextGenerator, UpstreamError};
use predictia::server::{create_router, AppState, ServerConfig};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

/// Replies with a canned answer chosen by the prompt's model and sampling
struct CannedGenerator {
    calls: AtomicUsize,
}

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if request.max_output_tokens == 1024 {
            Ok("```json\n{\"is_similar\": true, \"similarity_level\": \"high\", \
                \"originality_assessment\": \"Derivative\", \
                \"detailed_analysis\": \"Same structure\"}\n```"
                .to_string())
        } else if request.max_output_tokens == 500 {
            Ok("New drop today #music".to_string())
        } else {
            Ok("A short summary.".to_string())
        }
    }
}

struct FailingGenerator {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(UpstreamError::Status {
            status: 503,
            body: "overloaded".to_string(),
        })
    }
}

fn config(dir: &TempDir) -> ServerConfig {
    ServerConfig {
        data_dir: dir.path().display().to_string(),
        content: ContentConfig {
            api_key: None,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn app_with(generator: Arc<dyn TextGenerator>) -> (Router, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir);
    let state = Arc::new(AppState::with_generator(config.clone(), generator).unwrap());
    (create_router(state, &config), dir)
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 64).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_similarity_parses_fenced_json() {
    let (app, _dir) = app_with(Arc::new(CannedGenerator { calls: AtomicUsize::new(0) }));
    let (status, body) = post(
        &app,
        "/content/similarity",
        json!({"content_1": "first text", "content_2": "second text"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_similar"], true);
    assert_eq!(body["similarity_level"], "high");
    assert_eq!(body["detailed_analysis"], "Same structure");
}

#[tokio::test]
async fn test_caption_and_summary() {
    let (app, _dir) = app_with(Arc::new(CannedGenerator { calls: AtomicUsize::new(0) }));

    let (status, body) = post(
        &app,
        "/content/caption",
        json!({"platform": "instagram", "title": "New single"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["caption"], "New drop today #music");
    assert_eq!(body["platform"], "instagram");

    let (status, body) = post(&app, "/content/summary", json!({"content": "A long article."})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"], "A short summary.");
}

#[tokio::test]
async fn test_empty_fields_rejected() {
    let (app, _dir) = app_with(Arc::new(CannedGenerator { calls: AtomicUsize::new(0) }));

    let (status, body) = post(
        &app,
        "/content/similarity",
        json!({"content_1": "  ", "content_2": "text"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");

    let (status, _) = post(&app, "/content/caption", json!({"platform": "", "title": "t"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_api_key_is_500() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir);
    let state = Arc::new(AppState::new(config.clone()).unwrap());
    let app = create_router(state, &config);

    let (status, body) = post(&app, "/content/summary", json!({"content": "text"})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "upstream_not_configured");
}

#[tokio::test]
async fn test_upstream_failure_retried_once_then_502() {
    let calls = Arc::new(AtomicUsize::new(0));
    let (app, _dir) = app_with(Arc::new(FailingGenerator { calls: Arc::clone(&calls) }));

    let (status, body) = post(&app, "/content/summary", json!({"content": "text"})).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "upstream_error");
    assert!(!body["message"].as_str().unwrap().contains("overloaded"));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
