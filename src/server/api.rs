//! API route definitions

use std::sync::Arc;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use super::{handlers, state::AppState, ServerConfig};

async fn handle_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": true,
            "code": "not_found",
            "message": "Not found. GET /health to check API status.",
        })),
    )
}

async fn handle_405() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({
            "error": true,
            "code": "method_not_allowed",
            "message": "Method not allowed for this route.",
        })),
    )
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origin = config
        .cors_origin
        .as_deref()
        .filter(|o| !o.is_empty() && *o != "*");

    match origin.map(|o| (o, o.parse::<HeaderValue>())) {
        Some((_, Ok(value))) => CorsLayer::new()
            .allow_origin(value)
            .allow_methods(Any)
            .allow_headers(Any),
        Some((raw, Err(_))) => {
            warn!(origin = %raw, "Invalid CORS_ORIGIN, allowing all origins");
            CorsLayer::permissive()
        }
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    }
}

/// Create the main application router
pub fn create_router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    Router::new()
        // System
        .route("/health", get(handlers::health_check))
        // Models
        .route("/models", get(handlers::list_models))
        .route("/models/:model_id", get(handlers::get_model))
        .route("/models/:model_id/delete", delete(handlers::delete_model))
        // Training
        .route("/training", post(handlers::start_training))
        // Inference
        .route("/predictions/:model_id", post(handlers::predict))
        // Content
        .route("/content/similarity", post(handlers::check_similarity))
        .route("/content/caption", post(handlers::generate_caption))
        .route("/content/summary", post(handlers::summarize))
        .fallback(handle_404)
        .method_not_allowed_fallback(handle_405)
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .layer(CompressionLayer::new())
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
}
