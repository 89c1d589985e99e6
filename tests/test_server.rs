//! Integration test: Server API endpoints

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use predictia::content::{GenerationRequest, TextGenerator, UpstreamError};
use predictia::server::{create_router, AppState, ServerConfig};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

struct EchoGenerator;

#[async_trait]
impl TextGenerator for EchoGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, UpstreamError> {
        Ok(format!("echo from {}", request.model))
    }
}

fn test_app() -> (Router, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        data_dir: dir.path().display().to_string(),
        ..Default::default()
    };
    let state = Arc::new(AppState::with_generator(config.clone(), Arc::new(EchoGenerator)).unwrap());
    (create_router(state, &config), dir)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 64).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn wait_for_terminal(app: &Router, model_id: &str) -> Value {
    for _ in 0..1500 {
        let (status, record) = send(app, "GET", &format!("/models/{}", model_id), None).await;
        assert_eq!(status, StatusCode::OK);
        if record["status"] != "training" && record["status"] != "queued" {
            return record;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("model {} never left the training state", model_id);
}

fn churn_request(model_id: &str) -> Value {
    json!({
        "model_id": model_id,
        "training_data": [
            {"age": 25, "hours": 2, "genre": "Music", "will_churn": 1},
            {"age": 41, "hours": 9, "genre": "Gaming", "will_churn": 0},
            {"age": 23, "hours": 1, "genre": "Music", "will_churn": 1},
            {"age": 38, "hours": 8, "genre": "Gaming", "will_churn": 0}
        ],
        "feature_cols": ["age", "hours", "genre"],
        "target_col": "will_churn"
    })
}

async fn train_ready(app: &Router, model_id: &str) -> Value {
    let (status, body) = send(app, "POST", "/training", Some(churn_request(model_id))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "training");
    let record = wait_for_terminal(app, model_id).await;
    assert_eq!(record["status"], "ready", "record: {}", record);
    record
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _dir) = test_app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_models_empty_catalog() {
    let (app, _dir) = test_app();
    let (status, body) = send(&app, "GET", "/models", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
    assert_eq!(body["models"], json!([]));
}

#[tokio::test]
async fn test_train_then_predict() {
    let (app, _dir) = test_app();
    let record = train_ready(&app, "churn").await;
    assert_eq!(record["model_type"], "classification");
    assert_eq!(record["categorical_cols"], json!(["genre"]));
    assert_eq!(record["feature_cols"], json!(["age", "hours", "genre"]));

    let (status, body) = send(
        &app,
        "POST",
        "/predictions/churn",
        Some(json!({"input_data": [
            {"age": 24, "hours": 1, "genre": "Music"},
            {"age": 40, "hours": 9, "genre": "Gaming"}
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["model_id"], "churn");
    assert_eq!(body["count"], 2);
    assert_eq!(body["predictions"], json!([1, 0]));

    let (_, list) = send(&app, "GET", "/models", None).await;
    assert_eq!(list["count"], 1);
}

#[tokio::test]
async fn test_training_accepts_id_alias() {
    let (app, _dir) = test_app();
    let mut request = churn_request("aliased");
    let obj = request.as_object_mut().unwrap();
    let id = obj.remove("model_id").unwrap();
    obj.insert("id".to_string(), id);

    let (status, _) = send(&app, "POST", "/training", Some(request)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let record = wait_for_terminal(&app, "aliased").await;
    assert_eq!(record["status"], "ready");
}

#[tokio::test]
async fn test_get_model_is_idempotent() {
    let (app, _dir) = test_app();
    train_ready(&app, "stable").await;

    let (_, first) = send(&app, "GET", "/models/stable", None).await;
    let (_, second) = send(&app, "GET", "/models/stable", None).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_empty_training_data_rejected() {
    let (app, _dir) = test_app();
    let (status, body) = send(
        &app,
        "POST",
        "/training",
        Some(json!({"model_id": "empty", "training_data": [], "target_col": "y"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], true);
    assert_eq!(body["code"], "validation_error");

    let (status, _) = send(&app, "GET", "/models/empty", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// Enough rows that the fit is still running when a second request arrives
fn large_request(model_id: &str) -> Value {
    let rows: Vec<Value> = (0..5000)
        .map(|i| {
            let x = (i % 100) as f64;
            json!({"x": x, "z": (i % 7) as f64, "w": (i % 13) as f64, "label": if x < 50.0 { 0 } else { 1 }})
        })
        .collect();
    json!({"model_id": model_id, "training_data": rows, "target_col": "label"})
}

#[tokio::test]
async fn test_duplicate_training_conflicts() {
    let (app, _dir) = test_app();
    let (first, _) = send(&app, "POST", "/training", Some(large_request("dup"))).await;
    let (second, body) = send(&app, "POST", "/training", Some(churn_request("dup"))).await;

    assert_eq!(first, StatusCode::ACCEPTED);
    assert_eq!(second, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");

    let record = wait_for_terminal(&app, "dup").await;
    assert_eq!(record["status"], "ready");
}

#[tokio::test]
async fn test_failed_training_is_visible_on_poll() {
    let (app, _dir) = test_app();
    let (status, _) = send(
        &app,
        "POST",
        "/training",
        Some(json!({
            "model_id": "single-class",
            "training_data": [{"x": 1, "y": "a"}, {"x": 2, "y": "a"}],
            "target_col": "y"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let record = wait_for_terminal(&app, "single-class").await;
    assert_eq!(record["status"], "failed");
    assert!(record["error"].is_string());

    let (status, body) = send(
        &app,
        "POST",
        "/predictions/single-class",
        Some(json!({"input_data": [{"x": 1}]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "model_not_ready");
}

#[tokio::test]
async fn test_delete_is_final() {
    let (app, _dir) = test_app();
    train_ready(&app, "gone").await;

    let (status, body) = send(&app, "DELETE", "/models/gone/delete", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "deleted");
    assert_eq!(body["model_id"], "gone");

    let (status, _) = send(&app, "GET", "/models/gone", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        "/predictions/gone",
        Some(json!({"input_data": [{"age": 30, "hours": 4, "genre": "Music"}]})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", "/models/gone/delete", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_model_is_404() {
    let (app, _dir) = test_app();
    let (status, body) = send(&app, "GET", "/models/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");

    let (status, _) = send(
        &app,
        "POST",
        "/predictions/nope",
        Some(json!({"input_data": [{"x": 1}]})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_feature_names_column() {
    let (app, _dir) = test_app();
    train_ready(&app, "strict").await;

    let (status, body) = send(
        &app,
        "POST",
        "/predictions/strict",
        Some(json!({"input_data": [
            {"age": 30, "hours": 4, "genre": "Music"},
            {"age": 30, "genre": "Music"}
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "missing_feature");
    assert!(body["message"].as_str().unwrap().contains("hours"));
    assert!(body.get("predictions").is_none());
}

#[tokio::test]
async fn test_unknown_category_rejected() {
    let (app, _dir) = test_app();
    train_ready(&app, "genres").await;

    let (status, body) = send(
        &app,
        "POST",
        "/predictions/genres",
        Some(json!({"input_data": [{"age": 30, "hours": 4, "genre": "Sports"}]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "unknown_category");
    assert!(body["message"].as_str().unwrap().contains("Sports"));
}

#[tokio::test]
async fn test_malformed_json_rejected() {
    let (app, _dir) = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/training")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "POST", "/training", Some(json!({"model_id": "x"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");
}

#[tokio::test]
async fn test_unknown_route_and_wrong_method() {
    let (app, _dir) = test_app();
    let (status, body) = send(&app, "GET", "/nowhere", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");

    let (status, body) = send(&app, "GET", "/training", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["code"], "method_not_allowed");
}
