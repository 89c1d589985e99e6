//! Application state management

use std::sync::Arc;

use crate::content::{ContentService, GeminiClient, TextGenerator};
use crate::registry::Registry;

use super::error::Result;
use super::ServerConfig;

/// Application state shared across handlers
pub struct AppState {
    pub config: ServerConfig,
    pub registry: Arc<Registry>,
    pub content: ContentService,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// Open the registry under `config.data_dir` and connect the Gemini client
    pub fn new(config: ServerConfig) -> Result<Self> {
        let generator = Arc::new(GeminiClient::new(&config.content)?);
        Self::with_generator(config, generator)
    }

    /// Same as [`AppState::new`] with a caller-supplied text generator
    pub fn with_generator(config: ServerConfig, generator: Arc<dyn TextGenerator>) -> Result<Self> {
        let registry = Registry::open(&config.data_dir, config.training.clone())?;

        Ok(Self {
            config,
            registry: Arc::new(registry),
            content: ContentService::new(generator),
            started_at: chrono::Utc::now(),
        })
    }
}
