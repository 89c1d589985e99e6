//! Registry: training dispatch, lookups, deletion and prediction

use super::artifacts::ArtifactStore;
use super::metadata::{MetadataStore, ModelMetadata, ModelStatus};
use crate::error::{PredictiaError, Result};
use crate::inference::predict_records;
use crate::preprocessing::{columns_from_partition, LabelEncoder, Record};
use crate::training::{run_training, ModelType, TrainedModel, TrainingJob, TrainingOutcome, TrainingSettings};
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

const MAX_MODEL_ID_LEN: usize = 128;

/// Request to train (or retrain) a model
#[derive(Debug, Clone, Deserialize)]
pub struct TrainingRequest {
    #[serde(alias = "id")]
    pub model_id: String,
    pub training_data: Vec<Record>,
    #[serde(default)]
    pub feature_cols: Option<Vec<String>>,
    pub target_col: String,
    #[serde(default)]
    pub model_type: Option<ModelType>,
}

/// Owner of the catalog and the artifacts, and the only way to change them.
///
/// `gate` keeps artifact sets consistent for readers: predictions hold the
/// read side while they check status and load artifacts; finalizing a run,
/// deleting a model and purging before a retrain hold the write side.
pub struct Registry {
    metadata: MetadataStore,
    artifacts: ArtifactStore,
    settings: TrainingSettings,
    gate: RwLock<()>,
    permits: Arc<Semaphore>,
}

impl Registry {
    /// Open the registry rooted at `data_dir` (`metadata.json` + `models/`)
    pub fn open(data_dir: impl AsRef<Path>, settings: TrainingSettings) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let metadata = MetadataStore::open(data_dir.join("metadata.json"))?;
        let artifacts = ArtifactStore::open(data_dir.join("models"))?;
        let permits = Arc::new(Semaphore::new(settings.max_concurrent_trainings.max(1)));

        Ok(Self {
            metadata,
            artifacts,
            settings,
            gate: RwLock::new(()),
            permits,
        })
    }

    /// Open an existing registry for reads only.
    ///
    /// Nothing on disk is recovered or rewritten, so this is safe next to a
    /// server using the same `data_dir`. Training and deletion fail.
    pub fn open_read_only(data_dir: impl AsRef<Path>, settings: TrainingSettings) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let metadata = MetadataStore::open_read_only(data_dir.join("metadata.json"))?;
        let artifacts = ArtifactStore::open_read_only(data_dir.join("models"));
        let permits = Arc::new(Semaphore::new(settings.max_concurrent_trainings.max(1)));

        Ok(Self {
            metadata,
            artifacts,
            settings,
            gate: RwLock::new(()),
            permits,
        })
    }

    pub fn settings(&self) -> &TrainingSettings {
        &self.settings
    }

    /// Write the `training` record and dispatch the fit in the background.
    ///
    /// Returns as soon as the record is durable. Blocks on the registry
    /// lock and the metadata write, so async callers run it through
    /// `spawn_blocking`. Must be called inside a tokio runtime.
    pub fn start_training(self: &Arc<Self>, request: TrainingRequest) -> Result<ModelMetadata> {
        let (record, job) = self.begin(request)?;
        let run_id = record.run_id.clone().unwrap_or_default();
        self.dispatch(job, run_id);
        Ok(record)
    }

    /// Run a training job inline and return the terminal record
    pub async fn train_now(self: &Arc<Self>, request: TrainingRequest) -> Result<ModelMetadata> {
        let registry = Arc::clone(self);
        let (record, job) = tokio::task::spawn_blocking(move || registry.begin(request))
            .await
            .map_err(|e| PredictiaError::Training(format!("training setup task failed: {e}")))??;
        let model_id = record.model_id.clone();
        self.execute(job, record.run_id.unwrap_or_default()).await;
        self.metadata.get(&model_id)
    }

    pub fn get(&self, model_id: &str) -> Result<ModelMetadata> {
        self.metadata.get(model_id)
    }

    pub fn list(&self) -> Vec<ModelMetadata> {
        self.metadata.list()
    }

    /// Remove a model's record and artifacts.
    ///
    /// An in-flight run for the id loses ownership and discards its result.
    pub fn delete(&self, model_id: &str) -> Result<ModelMetadata> {
        let _gate = self.gate.write();
        let removed = self.metadata.delete(model_id)?;
        if let Err(e) = self.artifacts.delete_all(model_id) {
            warn!(model_id = %model_id, error = %e, "Failed to remove artifacts of deleted model");
        }
        info!(model_id = %model_id, status = %removed.status, "Model deleted");
        Ok(removed)
    }

    /// Predict with a ready model; all rows succeed or the call fails
    pub fn predict(&self, model_id: &str, input_data: &[Record]) -> Result<Vec<Value>> {
        let (record, model, encoders) = {
            let _gate = self.gate.read();
            let record = self.metadata.get(model_id)?;
            if record.status != ModelStatus::Ready {
                return Err(PredictiaError::NotReady {
                    model_id: model_id.to_string(),
                    status: record.status.to_string(),
                });
            }
            if input_data.is_empty() {
                return Err(PredictiaError::Validation("input_data must not be empty".to_string()));
            }

            let model: TrainedModel = self.artifacts.load_model(model_id)?;
            let mut encoders = BTreeMap::new();
            for column in &record.categorical_cols {
                let encoder: LabelEncoder = self.artifacts.load_encoder(model_id, column)?;
                encoders.insert(column.clone(), encoder);
            }
            (record, model, encoders)
        };

        let columns = columns_from_partition(&record.feature_cols, &record.categorical_cols);
        predict_records(&columns, &model, &encoders, input_data)
    }

    /// Validate a request, write the `training` record and purge any
    /// artifacts from a previous run
    fn begin(&self, request: TrainingRequest) -> Result<(ModelMetadata, TrainingJob)> {
        let job = validate_request(request)?;
        let run_id = uuid::Uuid::new_v4().to_string();
        let record = ModelMetadata::training(
            job.model_id.clone(),
            job.feature_cols.clone(),
            job.target_col.clone(),
            job.model_type,
            run_id.clone(),
        );

        {
            let _gate = self.gate.write();
            let previous = self.metadata.begin_training(record.clone())?;
            if previous.is_some() {
                if let Err(e) = self.artifacts.delete_all(&job.model_id) {
                    warn!(model_id = %job.model_id, error = %e, "Failed to purge previous artifacts");
                }
            }
        }

        info!(
            model_id = %job.model_id,
            run_id = %run_id,
            rows = job.training_data.len(),
            features = job.feature_cols.len(),
            "Training record created"
        );

        Ok((record, job))
    }

    fn dispatch(self: &Arc<Self>, job: TrainingJob, run_id: String) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move { registry.execute(job, run_id).await })
    }

    /// Run the fit and write exactly one terminal status for `run_id`.
    ///
    /// The fit and the finalize step each run on the blocking pool; only the
    /// permit wait happens on the runtime.
    async fn execute(self: &Arc<Self>, job: TrainingJob, run_id: String) {
        let model_id = job.model_id.clone();
        let start = Instant::now();

        let outcome = match self.permits.acquire().await {
            Ok(_permit) => {
                info!(model_id = %model_id, run_id = %run_id, "Fit started");
                let settings = self.settings.clone();
                match tokio::task::spawn_blocking(move || run_training(&job, &settings)).await {
                    Ok(result) => result.map_err(|e| e.to_string()),
                    Err(join_err) => {
                        error!(model_id = %model_id, run_id = %run_id, error = %join_err, "Training task panicked");
                        Err("training task panicked".to_string())
                    }
                }
            }
            Err(_) => Err("training executor is shut down".to_string()),
        };
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let registry = Arc::clone(self);
        let (id, run) = (model_id.clone(), run_id.clone());
        let finalize = tokio::task::spawn_blocking(move || registry.finalize(&id, &run, outcome, elapsed_ms));
        if let Err(e) = finalize.await {
            error!(model_id = %model_id, run_id = %run_id, error = %e, "Finalize task panicked");
        }
    }

    fn finalize(
        &self,
        model_id: &str,
        run_id: &str,
        outcome: std::result::Result<TrainingOutcome, String>,
        elapsed_ms: u64,
    ) {
        match outcome {
            Ok(outcome) => {
                if let Err(e) = self.finish_ready(model_id, run_id, outcome, elapsed_ms) {
                    error!(model_id = %model_id, run_id = %run_id, error = %e, "Failed to store trained model");
                    self.finish_failed(model_id, run_id, e.to_string());
                }
            }
            Err(message) => self.finish_failed(model_id, run_id, message),
        }
    }

    fn finish_ready(
        &self,
        model_id: &str,
        run_id: &str,
        outcome: TrainingOutcome,
        elapsed_ms: u64,
    ) -> Result<()> {
        let _gate = self.gate.write();

        if !self.owns(model_id, run_id) {
            info!(model_id = %model_id, run_id = %run_id, "Run no longer owns the model, discarding result");
            return Ok(());
        }

        if let Err(e) = self.write_artifacts(model_id, &outcome) {
            if let Err(cleanup) = self.artifacts.delete_all(model_id) {
                warn!(model_id = %model_id, error = %cleanup, "Failed to remove partial artifacts");
            }
            return Err(e);
        }

        let TrainingOutcome {
            categorical_cols,
            numerical_cols,
            model_type,
            n_samples,
            training_score,
            ..
        } = outcome;

        self.metadata.modify(model_id, |r| {
            r.status = ModelStatus::Ready;
            r.categorical_cols = categorical_cols;
            r.numerical_cols = numerical_cols;
            r.model_type = Some(model_type);
            r.n_samples = Some(n_samples);
            r.training_score = Some(training_score);
            r.error = None;
            true
        })?;

        info!(
            model_id = %model_id,
            run_id = %run_id,
            model_type = %model_type,
            rows = n_samples,
            training_score,
            elapsed_ms,
            "Model ready"
        );
        Ok(())
    }

    fn write_artifacts(&self, model_id: &str, outcome: &TrainingOutcome) -> Result<()> {
        self.artifacts.delete_all(model_id)?;
        self.artifacts.save_model(model_id, &outcome.model)?;
        for (column, encoder) in &outcome.encoders {
            self.artifacts.save_encoder(model_id, column, encoder)?;
        }
        Ok(())
    }

    fn finish_failed(&self, model_id: &str, run_id: &str, message: String) {
        let _gate = self.gate.write();

        if !self.owns(model_id, run_id) {
            info!(model_id = %model_id, run_id = %run_id, "Run no longer owns the model, discarding failure");
            return;
        }

        if let Err(e) = self.artifacts.delete_all(model_id) {
            warn!(model_id = %model_id, error = %e, "Failed to remove partial artifacts");
        }

        let result = self.metadata.modify(model_id, |r| {
            r.status = ModelStatus::Failed;
            r.error = Some(message.clone());
            true
        });

        match result {
            Ok(_) => warn!(model_id = %model_id, run_id = %run_id, error = %message, "Training failed"),
            Err(e) => error!(model_id = %model_id, run_id = %run_id, error = %e, "Failed to record training failure"),
        }
    }

    /// Whether `run_id` still owns an in-flight record for `model_id`
    fn owns(&self, model_id: &str, run_id: &str) -> bool {
        self.metadata
            .get(model_id)
            .map(|r| r.is_owned_by(run_id) && r.status.is_in_flight())
            .unwrap_or(false)
    }
}

/// Check a model id is usable as a directory name
pub fn validate_model_id(model_id: &str) -> Result<()> {
    if model_id.is_empty() || model_id.len() > MAX_MODEL_ID_LEN {
        return Err(PredictiaError::Validation(format!(
            "model_id must be 1 to {MAX_MODEL_ID_LEN} characters"
        )));
    }
    if model_id.starts_with('.') {
        return Err(PredictiaError::Validation("model_id must not start with '.'".to_string()));
    }
    if !model_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(PredictiaError::Validation(
            "model_id may only contain letters, digits, '_', '-' and '.'".to_string(),
        ));
    }
    Ok(())
}

/// Validate a training request and resolve its feature columns
pub fn validate_request(request: TrainingRequest) -> Result<TrainingJob> {
    validate_model_id(&request.model_id)?;

    if request.training_data.is_empty() {
        return Err(PredictiaError::Validation("training_data must not be empty".to_string()));
    }

    let target = request.target_col.as_str();
    if target.is_empty() {
        return Err(PredictiaError::Validation("target_col must not be empty".to_string()));
    }
    for (row, record) in request.training_data.iter().enumerate() {
        match record.get(target) {
            None | Some(Value::Null) => {
                return Err(PredictiaError::Validation(format!(
                    "Target column '{target}' is missing or null in row {row}"
                )));
            }
            Some(_) => {}
        }
    }

    let feature_cols = match request.feature_cols {
        Some(cols) => {
            if cols.is_empty() {
                return Err(PredictiaError::Validation("feature_cols must not be empty".to_string()));
            }
            let mut seen = HashSet::new();
            for col in &cols {
                if !seen.insert(col.as_str()) {
                    return Err(PredictiaError::Validation(format!(
                        "Duplicate feature column '{col}'"
                    )));
                }
                if col == target {
                    return Err(PredictiaError::Validation(format!(
                        "Target column '{target}' cannot also be a feature"
                    )));
                }
                if !request.training_data.iter().any(|r| r.contains_key(col)) {
                    return Err(PredictiaError::Validation(format!(
                        "Feature column '{col}' does not appear in training_data"
                    )));
                }
            }
            cols
        }
        None => {
            let mut seen = HashSet::new();
            let mut cols = Vec::new();
            for key in request.training_data.iter().flat_map(|r| r.keys()) {
                if key != target && seen.insert(key.clone()) {
                    cols.push(key.clone());
                }
            }
            if cols.is_empty() {
                return Err(PredictiaError::Validation(
                    "training_data has no columns besides the target".to_string(),
                ));
            }
            cols
        }
    };

    Ok(TrainingJob {
        model_id: request.model_id,
        training_data: request.training_data,
        feature_cols,
        target_col: request.target_col,
        model_type: request.model_type,
    })
}
