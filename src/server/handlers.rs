//! HTTP request handlers

use std::sync::Arc;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::preprocessing::Record;
use crate::registry::{ModelMetadata, TrainingRequest};
use crate::content::SimilarityReport;

use super::error::{Result, ServerError};
use super::state::AppState;

// ============================================================================
// System
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Models
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelListResponse {
    pub models: Vec<ModelMetadata>,
    pub count: usize,
}

pub async fn list_models(State(state): State<Arc<AppState>>) -> Json<ModelListResponse> {
    let models = state.registry.list();
    let count = models.len();
    Json(ModelListResponse { models, count })
}

pub async fn get_model(
    State(state): State<Arc<AppState>>,
    Path(model_id): Path<String>,
) -> Result<Json<ModelMetadata>> {
    Ok(Json(state.registry.get(&model_id)?))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub model_id: String,
    pub status: String,
    pub message: String,
}

pub async fn delete_model(
    State(state): State<Arc<AppState>>,
    Path(model_id): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let registry = Arc::clone(&state.registry);
    let id = model_id.clone();
    tokio::task::spawn_blocking(move || registry.delete(&id))
        .await
        .map_err(|e| ServerError::Internal(format!("Delete task failed: {}", e)))??;

    Ok(Json(DeleteResponse {
        message: format!("Model '{}' and its artifacts were deleted", model_id),
        model_id,
        status: "deleted".to_string(),
    }))
}

// ============================================================================
// Training
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct TrainingAccepted {
    pub model_id: String,
    pub status: String,
    pub message: String,
}

/// Write the `training` record and return 202 while the fit runs
pub async fn start_training(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<TrainingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TrainingAccepted>)> {
    let Json(request) = payload?;
    let registry = Arc::clone(&state.registry);
    let record = tokio::task::spawn_blocking(move || registry.start_training(request))
        .await
        .map_err(|e| ServerError::Internal(format!("Training setup task failed: {}", e)))??;

    info!(model_id = %record.model_id, "Training accepted");

    Ok((
        StatusCode::ACCEPTED,
        Json(TrainingAccepted {
            message: format!(
                "Training started for model '{}'. Poll GET /models/{} for status.",
                record.model_id, record.model_id
            ),
            model_id: record.model_id,
            status: record.status.to_string(),
        }),
    ))
}

// ============================================================================
// Inference
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PredictionRequest {
    pub input_data: Vec<Record>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub model_id: String,
    pub predictions: Vec<Value>,
    pub count: usize,
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    Path(model_id): Path<String>,
    payload: std::result::Result<Json<PredictionRequest>, JsonRejection>,
) -> Result<Json<PredictionResponse>> {
    let Json(request) = payload?;

    let registry = Arc::clone(&state.registry);
    let id = model_id.clone();
    let predictions = tokio::task::spawn_blocking(move || registry.predict(&id, &request.input_data))
        .await
        .map_err(|e| ServerError::Internal(format!("Prediction task failed: {}", e)))??;

    let count = predictions.len();
    Ok(Json(PredictionResponse {
        model_id,
        predictions,
        count,
    }))
}

// ============================================================================
// Content
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SimilarityRequest {
    pub content_1: String,
    pub content_2: String,
}

pub async fn check_similarity(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<SimilarityRequest>, JsonRejection>,
) -> Result<Json<SimilarityReport>> {
    let Json(request) = payload?;
    let report = state
        .content
        .check_similarity(&request.content_1, &request.content_2)
        .await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct CaptionRequest {
    pub platform: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CaptionResponse {
    pub caption: String,
    pub platform: String,
}

pub async fn generate_caption(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<CaptionRequest>, JsonRejection>,
) -> Result<Json<CaptionResponse>> {
    let Json(request) = payload?;
    let caption = state
        .content
        .generate_caption(&request.platform, &request.title, &request.description)
        .await?;
    Ok(Json(CaptionResponse {
        caption,
        platform: request.platform,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SummaryRequest {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub summary: String,
}

pub async fn summarize(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<SummaryRequest>, JsonRejection>,
) -> Result<Json<SummaryResponse>> {
    let Json(request) = payload?;
    let summary = state.content.summarize(&request.content).await?;
    Ok(Json(SummaryResponse { summary }))
}
