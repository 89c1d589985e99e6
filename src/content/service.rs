//! Content service: prompt dispatch with a single retry

use super::client::{GenerationRequest, TextGenerator, UpstreamError};
use super::prompts;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Structured verdict of a similarity check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityReport {
    pub is_similar: bool,
    pub similarity_level: String,
    pub originality_assessment: String,
    pub detailed_analysis: String,
}

impl SimilarityReport {
    /// Parse the model's JSON reply, tolerating code fences and missing fields
    pub fn parse(reply: &str) -> Result<Self, UpstreamError> {
        let value: Value = serde_json::from_str(prompts::strip_code_fences(reply))
            .map_err(|e| UpstreamError::InvalidResponse(e.to_string()))?;
        let obj = value
            .as_object()
            .ok_or_else(|| UpstreamError::InvalidResponse("expected a JSON object".to_string()))?;

        let text = |key: &str, default: &str| {
            obj.get(key)
                .and_then(Value::as_str)
                .unwrap_or(default)
                .to_string()
        };

        Ok(Self {
            is_similar: obj.get("is_similar").and_then(Value::as_bool).unwrap_or(false),
            similarity_level: text("similarity_level", "different"),
            originality_assessment: text("originality_assessment", "Unable to assess originality."),
            detailed_analysis: text("detailed_analysis", "Unable to provide detailed analysis."),
        })
    }
}

/// Front for the three content prompts
#[derive(Clone)]
pub struct ContentService {
    generator: Arc<dyn TextGenerator>,
}

impl ContentService {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn check_similarity(
        &self,
        content_1: &str,
        content_2: &str,
    ) -> Result<SimilarityReport, ContentError> {
        require("content_1", content_1)?;
        require("content_2", content_2)?;

        let request = prompts::similarity_request(content_1, content_2);
        Ok(self.generate_with_retry(&request, SimilarityReport::parse).await?)
    }

    pub async fn generate_caption(
        &self,
        platform: &str,
        title: &str,
        description: &str,
    ) -> Result<String, ContentError> {
        require("platform", platform)?;
        require("title", title)?;

        let request = prompts::caption_request(platform, title, description);
        Ok(self.generate_with_retry(&request, |s| Ok(s.to_string())).await?)
    }

    pub async fn summarize(&self, content: &str) -> Result<String, ContentError> {
        require("content", content)?;

        let request = prompts::summary_request(content);
        Ok(self.generate_with_retry(&request, |s| Ok(s.to_string())).await?)
    }

    /// Send the request, retrying once on a retryable failure
    async fn generate_with_retry<T, F>(
        &self,
        request: &GenerationRequest,
        parse: F,
    ) -> Result<T, UpstreamError>
    where
        F: Fn(&str) -> Result<T, UpstreamError>,
    {
        let attempt = |reply: Result<String, UpstreamError>| {
            reply.and_then(|text| {
                let text = text.trim();
                if text.is_empty() {
                    return Err(UpstreamError::EmptyResponse);
                }
                parse(text)
            })
        };

        match attempt(self.generator.generate(request).await) {
            Err(e) if e.is_retryable() => {
                warn!(model = %request.model, error = %e, "Upstream call failed, retrying once");
                attempt(self.generator.generate(request).await)
            }
            other => other,
        }
    }
}

fn require(field: &str, value: &str) -> Result<(), ContentError> {
    if value.trim().is_empty() {
        return Err(ContentError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}
