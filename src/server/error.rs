//! Error types for the server

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::content::{ContentError, UpstreamError};
use crate::error::PredictiaError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Core(#[from] PredictiaError),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<UpstreamError> for ServerError {
    fn from(err: UpstreamError) -> Self {
        ServerError::Content(ContentError::Upstream(err))
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}

impl ServerError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ServerError::Core(e) => match e {
                PredictiaError::Validation(_)
                | PredictiaError::NotReady { .. }
                | PredictiaError::MissingFeature { .. }
                | PredictiaError::UnknownCategory { .. }
                | PredictiaError::InvalidFeatureValue { .. }
                | PredictiaError::NestedColumn(_) => (StatusCode::BAD_REQUEST, e.code(), e.to_string()),
                PredictiaError::NotFound(_) | PredictiaError::ArtifactNotFound { .. } => {
                    (StatusCode::NOT_FOUND, e.code(), e.to_string())
                }
                PredictiaError::Conflict(_) => (StatusCode::CONFLICT, e.code(), e.to_string()),
                _ => {
                    tracing::error!(detail = %e, code = e.code(), "Internal server error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal_error",
                        "An internal error occurred".to_string(),
                    )
                }
            },
            ServerError::Content(ContentError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg.clone())
            }
            ServerError::Content(ContentError::Upstream(UpstreamError::NotConfigured)) => {
                tracing::error!("Content request received but the generative API key is not configured");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "upstream_not_configured",
                    "Content services are not configured".to_string(),
                )
            }
            ServerError::Content(ContentError::Upstream(e)) => {
                tracing::error!(detail = %e, "Upstream generative API error");
                (
                    StatusCode::BAD_GATEWAY,
                    "upstream_error",
                    "The content service is temporarily unavailable".to_string(),
                )
            }
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "invalid_request", msg.clone()),
            ServerError::Internal(msg) => {
                tracing::error!(detail = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(json!({
            "error": true,
            "code": code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
