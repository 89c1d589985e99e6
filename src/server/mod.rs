//! Predictia Server Module
//!
//! REST API over the model registry (training, lookups, deletion and
//! prediction) and the content services.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use handlers::{
    CaptionResponse, DeleteResponse, HealthResponse, ModelListResponse, PredictionResponse,
    SummaryResponse, TrainingAccepted,
};
pub use state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::content::ContentConfig;
use crate::training::TrainingSettings;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Holds `metadata.json` and the `models/` artifact tree
    pub data_dir: String,
    pub max_body_size: usize,
    /// Allowed CORS origin; unset or `*` allows all
    pub cors_origin: Option<String>,
    pub training: TrainingSettings,
    pub content: ContentConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(50 * 1024 * 1024), // 50MB
            cors_origin: std::env::var("CORS_ORIGIN").ok(),
            training: TrainingSettings::from_env(),
            content: ContentConfig::from_env(),
        }
    }
}

/// Start the server with the given configuration
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();
    info!(
        data_dir = %config.data_dir,
        started_at = %start_time.to_rfc3339(),
        "Initializing server"
    );

    std::fs::create_dir_all(&config.data_dir)?;

    if !config.content.is_configured() {
        warn!("GEMINI_API_KEY not set, content endpoints will return errors");
    }

    let state = Arc::new(AppState::new(config.clone())?);
    let app = create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(
        host = %config.host,
        port = config.port,
        address = %addr,
        max_body_size_mb = config.max_body_size / 1024 / 1024,
        max_concurrent_trainings = config.training.max_concurrent_trainings,
        "Predictia server starting"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, pid = std::process::id(), "Server listening and ready to accept connections");

    // Graceful shutdown on ctrl+c
    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
        let stop_time = chrono::Utc::now();
        let uptime = stop_time.signed_duration_since(start_time);
        info!(
            stopped_at = %stop_time.to_rfc3339(),
            uptime_secs = uptime.num_seconds(),
            "Shutdown signal received, stopping server gracefully"
        );
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        if std::env::var("API_PORT").is_err() {
            assert_eq!(config.port, 8000);
        }
        if std::env::var("MAX_BODY_SIZE").is_err() {
            assert_eq!(config.max_body_size, 50 * 1024 * 1024);
        }
    }
}
