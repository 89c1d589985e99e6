//! Content services backed by a hosted generative text API
//!
//! Three prompts are offered: similarity analysis of two texts, social
//! caption generation, and summarization. The upstream is reached through
//! the [`TextGenerator`] trait; [`GeminiClient`] is the production
//! implementation.

pub mod client;
pub mod prompts;
pub mod service;

pub use client::{GeminiClient, GenerationRequest, TextGenerator, UpstreamError};
pub use service::{ContentError, ContentService, SimilarityReport};

/// Settings for the upstream generative API
#[derive(Debug, Clone)]
pub struct ContentConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ContentConfig {
    /// Read `GEMINI_API_KEY`, `GEMINI_BASE_URL` and `GEMINI_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("GEMINI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            base_url: std::env::var("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            timeout_secs: std::env::var("GEMINI_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}
