//! Predictia - Main Entry Point
//!
//! Runs the REST server by default; subcommands train, predict and list
//! models against a local data directory.

use clap::Parser;
use predictia::cli::{Cli, Commands, cmd_models, cmd_predict, cmd_serve, cmd_train};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "predictia=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { host, port, data_dir }) => {
            cmd_serve(&host, port, &data_dir).await?;
        }
        Some(Commands::Train { id, data, target, features, model_type, data_dir }) => {
            cmd_train(&id, &data, &target, features, model_type, &data_dir).await?;
        }
        Some(Commands::Predict { id, data, data_dir }) => {
            cmd_predict(&id, &data, &data_dir)?;
        }
        Some(Commands::Models { data_dir }) => {
            cmd_models(&data_dir)?;
        }
        None => {
            let config = predictia::server::ServerConfig::default();
            let data_dir = std::path::PathBuf::from(&config.data_dir);
            cmd_serve(&config.host, config.port, &data_dir).await?;
        }
    }

    Ok(())
}
