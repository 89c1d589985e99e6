//! Predictia CLI Module
//!
//! Command-line interface for serving the API and for training, predicting
//! and listing models against a local data directory.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::preprocessing::Record;
use crate::registry::{ModelMetadata, ModelStatus, Registry, TrainingRequest};
use crate::training::{ModelType, TrainingSettings};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }
fn bad(s: &str) -> ColoredString    { s.truecolor(235, 100, 100) }

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn status_label(status: ModelStatus) -> ColoredString {
    match status {
        ModelStatus::Ready => ok(status.as_str()),
        ModelStatus::Failed => bad(status.as_str()),
        ModelStatus::Queued | ModelStatus::Training => accent(status.as_str()),
    }
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "predictia")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train tabular models from JSON and serve predictions")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve {
        /// Bind address
        #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on
        #[arg(short, long, env = "API_PORT", default_value = "8000")]
        port: u16,

        /// Directory for metadata and model artifacts
        #[arg(long, env = "DATA_DIR", default_value = "./data")]
        data_dir: PathBuf,
    },

    /// Train a model inline from a JSON file of records
    Train {
        /// Model identifier
        #[arg(long)]
        id: String,

        /// JSON file holding an array of records
        #[arg(short, long)]
        data: PathBuf,

        /// Target column name
        #[arg(short, long)]
        target: String,

        /// Feature columns (comma separated); defaults to every other column
        #[arg(short, long, value_delimiter = ',')]
        features: Option<Vec<String>>,

        /// Force the model type (classification, regression)
        #[arg(long)]
        model_type: Option<ModelType>,

        #[arg(long, env = "DATA_DIR", default_value = "./data")]
        data_dir: PathBuf,
    },

    /// Predict with a trained model from a JSON file of records
    Predict {
        /// Model identifier
        #[arg(long)]
        id: String,

        /// JSON file holding an array of records
        #[arg(short, long)]
        data: PathBuf,

        #[arg(long, env = "DATA_DIR", default_value = "./data")]
        data_dir: PathBuf,
    },

    /// List the model catalog
    Models {
        #[arg(long, env = "DATA_DIR", default_value = "./data")]
        data_dir: PathBuf,
    },
}

fn load_records(path: &Path) -> anyhow::Result<Vec<Record>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
    let records: Vec<Record> = serde_json::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("{} is not a JSON array of objects: {}", path.display(), e))?;
    Ok(records)
}

fn open_registry(data_dir: &Path) -> anyhow::Result<Arc<Registry>> {
    Ok(Arc::new(Registry::open(data_dir, TrainingSettings::from_env())?))
}

/// Reads must not recover or rewrite a catalog a server may be using
fn open_registry_read_only(data_dir: &Path) -> anyhow::Result<Registry> {
    Ok(Registry::open_read_only(data_dir, TrainingSettings::from_env())?)
}

fn print_record(record: &ModelMetadata) {
    println!("  {}", kv("model   ", &record.model_id));
    println!("  {} {}", muted("status  "), status_label(record.status));
    if let Some(model_type) = record.model_type {
        println!("  {}", kv("type    ", &model_type.to_string()));
    }
    println!("  {}", kv("target  ", &record.target_col));
    println!("  {}", kv("features", &record.feature_cols.join(", ")));
    if !record.categorical_cols.is_empty() {
        println!("  {}", kv("encoded ", &record.categorical_cols.join(", ")));
    }
    if let Some(n) = record.n_samples {
        println!("  {}", kv("rows    ", &n.to_string()));
    }
    if let Some(score) = record.training_score {
        println!("  {}", kv("score   ", &format!("{:.4}", score)));
    }
    if let Some(err) = &record.error {
        println!("  {} {}", muted("error   "), bad(err));
    }
}

pub async fn cmd_train(
    id: &str,
    data_path: &Path,
    target: &str,
    features: Option<Vec<String>>,
    model_type: Option<ModelType>,
    data_dir: &Path,
) -> anyhow::Result<()> {
    section("Train");

    step_run("Loading data");
    let records = load_records(data_path)?;
    step_done(&format!("{} rows", records.len()));

    let registry = open_registry(data_dir)?;
    let request = TrainingRequest {
        model_id: id.to_string(),
        training_data: records,
        feature_cols: features,
        target_col: target.to_string(),
        model_type,
    };

    step_run(&format!("Training {}", id.cyan()));
    let start = Instant::now();
    let record = registry.train_now(request).await?;
    step_done(&format!("{:?}", start.elapsed()));

    println!();
    print_record(&record);
    println!();

    if record.status == ModelStatus::Failed {
        anyhow::bail!("Training failed for model '{}'", id);
    }
    Ok(())
}

pub fn cmd_predict(id: &str, data_path: &Path, data_dir: &Path) -> anyhow::Result<()> {
    section("Predict");

    let records = load_records(data_path)?;
    let registry = open_registry_read_only(data_dir)?;

    step_run(&format!("Predicting {} rows with {}", records.len(), id.cyan()));
    let start = Instant::now();
    let predictions = registry.predict(id, &records)?;
    step_done(&format!("{:?}", start.elapsed()));

    println!();
    println!("{}", serde_json::to_string_pretty(&predictions)?);
    Ok(())
}

pub fn cmd_models(data_dir: &Path) -> anyhow::Result<()> {
    section("Models");

    let registry = open_registry_read_only(data_dir)?;
    let models = registry.list();
    if models.is_empty() {
        println!("  {}", dim("no models"));
        println!();
        return Ok(());
    }

    for record in &models {
        print_record(record);
        println!();
    }
    println!("  {}", dim(&format!("{} model(s)", models.len())));
    println!();
    Ok(())
}

pub async fn cmd_serve(host: &str, port: u16, data_dir: &Path) -> anyhow::Result<()> {
    use crate::server::{run_server, ServerConfig};

    section(&format!("Predictia v{}", env!("CARGO_PKG_VERSION")));
    println!("  {}", kv("API    ", &format!("http://{}:{}", host, port)));
    println!("  {}", kv("Health ", &format!("http://{}:{}/health", host, port)));
    println!("  {}", kv("Data   ", &data_dir.display().to_string()));
    println!("  {}", dim("ctrl+c to stop"));
    println!();

    let config = ServerConfig {
        host: host.to_string(),
        port,
        data_dir: data_dir.display().to_string(),
        ..Default::default()
    };

    run_server(config).await
}
