//! Metadata store: the durable catalog of models

use crate::error::{PredictiaError, Result};
use crate::training::ModelType;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Error recorded on runs that were in flight when the process stopped
pub const INTERRUPTED_MESSAGE: &str = "training interrupted by service restart";

/// Lifecycle state of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    Queued,
    Training,
    Ready,
    Failed,
}

impl ModelStatus {
    /// A run for this record has not reached a terminal state
    pub fn is_in_flight(&self) -> bool {
        matches!(self, ModelStatus::Queued | ModelStatus::Training)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelStatus::Queued => "queued",
            ModelStatus::Training => "training",
            ModelStatus::Ready => "ready",
            ModelStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog entry for one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_id: String,
    pub status: ModelStatus,
    pub feature_cols: Vec<String>,
    pub target_col: String,
    #[serde(default)]
    pub categorical_cols: Vec<String>,
    #[serde(default)]
    pub numerical_cols: Vec<String>,
    #[serde(default)]
    pub model_type: Option<ModelType>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub error: Option<String>,
    /// Training run that owns this record; internal, never serialized
    #[serde(default, skip_serializing)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub n_samples: Option<usize>,
    #[serde(default)]
    pub training_score: Option<f64>,
}

impl ModelMetadata {
    /// Fresh record for a run that is about to start
    pub fn training(
        model_id: impl Into<String>,
        feature_cols: Vec<String>,
        target_col: impl Into<String>,
        model_type: Option<ModelType>,
        run_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            model_id: model_id.into(),
            status: ModelStatus::Training,
            feature_cols,
            target_col: target_col.into(),
            categorical_cols: Vec::new(),
            numerical_cols: Vec::new(),
            model_type,
            created_at: now,
            updated_at: now,
            error: None,
            run_id: Some(run_id.into()),
            n_samples: None,
            training_score: None,
        }
    }

    /// Whether `run_id` owns this record
    pub fn is_owned_by(&self, run_id: &str) -> bool {
        self.run_id.as_deref() == Some(run_id)
    }
}

/// JSON-file-backed catalog guarded by a single lock.
///
/// Every mutation writes the whole snapshot to a temporary file and renames
/// it over `metadata.json`; the in-memory map is swapped only after that
/// succeeds.
pub struct MetadataStore {
    path: PathBuf,
    records: RwLock<BTreeMap<String, ModelMetadata>>,
    read_only: bool,
}

impl MetadataStore {
    /// Open the store at `path`, creating an empty catalog if absent.
    ///
    /// Records left `queued`/`training` by a previous process are marked
    /// failed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut records = load_snapshot(&path)?;

        let mut recovered = 0usize;
        for record in records.values_mut().filter(|r| r.status.is_in_flight()) {
            warn!(model_id = %record.model_id, "Marking interrupted training run as failed");
            record.status = ModelStatus::Failed;
            record.error = Some(INTERRUPTED_MESSAGE.to_string());
            record.updated_at = Utc::now();
            recovered += 1;
        }

        if recovered > 0 || !path.exists() {
            write_snapshot(&path, &records)?;
        }

        info!(path = %path.display(), models = records.len(), "Metadata store opened");

        Ok(Self {
            path,
            records: RwLock::new(records),
            read_only: false,
        })
    }

    /// Load the catalog as it is on disk, for inspection next to a running
    /// server.
    ///
    /// No recovery is applied and nothing is written; every mutation fails.
    pub fn open_read_only(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = load_snapshot(&path)?;
        debug!(path = %path.display(), models = records.len(), "Metadata store opened read-only");

        Ok(Self {
            path,
            records: RwLock::new(records),
            read_only: true,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or replace a record
    pub fn put(&self, record: ModelMetadata) -> Result<()> {
        let mut guard = self.records.write();
        let mut next = guard.clone();
        next.insert(record.model_id.clone(), record);
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    pub fn get(&self, model_id: &str) -> Result<ModelMetadata> {
        self.records
            .read()
            .get(model_id)
            .cloned()
            .ok_or_else(|| PredictiaError::NotFound(model_id.to_string()))
    }

    /// All records ordered by id
    pub fn list(&self) -> Vec<ModelMetadata> {
        self.records.read().values().cloned().collect()
    }

    /// Remove a record, returning it
    pub fn delete(&self, model_id: &str) -> Result<ModelMetadata> {
        let mut guard = self.records.write();
        if !guard.contains_key(model_id) {
            return Err(PredictiaError::NotFound(model_id.to_string()));
        }
        let mut next = guard.clone();
        let removed = next
            .remove(model_id)
            .ok_or_else(|| PredictiaError::NotFound(model_id.to_string()))?;
        self.persist(&next)?;
        *guard = next;
        Ok(removed)
    }

    /// Insert a record for a new run unless one is already in flight.
    ///
    /// Returns the record that was replaced, if any.
    pub fn begin_training(&self, record: ModelMetadata) -> Result<Option<ModelMetadata>> {
        let mut guard = self.records.write();
        let previous = guard.get(&record.model_id).cloned();
        if let Some(existing) = &previous {
            if existing.status.is_in_flight() {
                return Err(PredictiaError::Conflict(format!(
                    "Model '{}' is already {}",
                    existing.model_id, existing.status
                )));
            }
        }

        let mut next = guard.clone();
        next.insert(record.model_id.clone(), record);
        self.persist(&next)?;
        *guard = next;
        Ok(previous)
    }

    /// Apply `f` to a record under the lock.
    ///
    /// The snapshot is persisted only when `f` returns `true`. Returns the
    /// record as it stands afterwards.
    pub fn modify<F>(&self, model_id: &str, f: F) -> Result<ModelMetadata>
    where
        F: FnOnce(&mut ModelMetadata) -> bool,
    {
        let mut guard = self.records.write();
        let mut record = guard
            .get(model_id)
            .cloned()
            .ok_or_else(|| PredictiaError::NotFound(model_id.to_string()))?;

        if !f(&mut record) {
            return Ok(record);
        }

        record.updated_at = Utc::now();
        let mut next = guard.clone();
        next.insert(model_id.to_string(), record.clone());
        self.persist(&next)?;
        *guard = next;
        Ok(record)
    }

    fn persist(&self, records: &BTreeMap<String, ModelMetadata>) -> Result<()> {
        if self.read_only {
            return Err(PredictiaError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} was opened read-only", self.path.display()),
            )));
        }
        write_snapshot(&self.path, records)
    }
}

fn load_snapshot(path: &Path) -> Result<BTreeMap<String, ModelMetadata>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let contents = fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    Ok(serde_json::from_str(&contents)?)
}

fn write_snapshot(path: &Path, records: &BTreeMap<String, ModelMetadata>) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, records)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| PredictiaError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(id: &str) -> ModelMetadata {
        ModelMetadata::training(id, vec!["a".into()], "y", None, "run-1")
    }

    #[test]
    fn test_put_get_list_delete() {
        let dir = tempdir().unwrap();
        let store = MetadataStore::open(dir.path().join("metadata.json")).unwrap();

        store.put(record("b")).unwrap();
        store.put(record("a")).unwrap();

        assert_eq!(store.get("a").unwrap().model_id, "a");
        let ids: Vec<String> = store.list().into_iter().map(|r| r.model_id).collect();
        assert_eq!(ids, vec!["a", "b"]);

        store.delete("a").unwrap();
        assert!(matches!(store.get("a"), Err(PredictiaError::NotFound(_))));
        assert!(matches!(store.delete("a"), Err(PredictiaError::NotFound(_))));
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        {
            let store = MetadataStore::open(&path).unwrap();
            let mut r = record("m");
            r.status = ModelStatus::Ready;
            r.model_type = Some(ModelType::Regression);
            store.put(r).unwrap();
        }

        let store = MetadataStore::open(&path).unwrap();
        let r = store.get("m").unwrap();
        assert_eq!(r.status, ModelStatus::Ready);
        assert_eq!(r.model_type, Some(ModelType::Regression));
    }

    #[test]
    fn test_restart_marks_in_flight_failed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        {
            let store = MetadataStore::open(&path).unwrap();
            store.put(record("m")).unwrap();
        }

        let store = MetadataStore::open(&path).unwrap();
        let r = store.get("m").unwrap();
        assert_eq!(r.status, ModelStatus::Failed);
        assert_eq!(r.error.as_deref(), Some(INTERRUPTED_MESSAGE));

        // Recovery is persisted too
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains(INTERRUPTED_MESSAGE));
    }

    #[test]
    fn test_begin_training_conflict() {
        let dir = tempdir().unwrap();
        let store = MetadataStore::open(dir.path().join("metadata.json")).unwrap();

        assert!(store.begin_training(record("m")).unwrap().is_none());
        assert!(matches!(
            store.begin_training(record("m")),
            Err(PredictiaError::Conflict(_))
        ));

        store
            .modify("m", |r| {
                r.status = ModelStatus::Failed;
                true
            })
            .unwrap();
        let previous = store.begin_training(record("m")).unwrap();
        assert_eq!(previous.map(|r| r.status), Some(ModelStatus::Failed));
    }

    #[test]
    fn test_modify_without_change_keeps_timestamp() {
        let dir = tempdir().unwrap();
        let store = MetadataStore::open(dir.path().join("metadata.json")).unwrap();
        store.put(record("m")).unwrap();
        let before = store.get("m").unwrap();

        let after = store.modify("m", |_| false).unwrap();
        assert_eq!(before, after);
        assert!(matches!(
            store.modify("missing", |_| true),
            Err(PredictiaError::NotFound(_))
        ));
    }

    #[test]
    fn test_read_only_open_leaves_catalog_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        let writer = MetadataStore::open(&path).unwrap();
        writer.put(record("live")).unwrap();
        let before = fs::read(&path).unwrap();

        let reader = MetadataStore::open_read_only(&path).unwrap();
        assert_eq!(reader.get("live").unwrap().status, ModelStatus::Training);
        assert!(matches!(reader.put(record("other")), Err(PredictiaError::Io(_))));
        assert!(reader.delete("live").is_err());

        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_read_only_open_of_missing_catalog_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("metadata.json");

        let reader = MetadataStore::open_read_only(&path).unwrap();
        assert!(reader.list().is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn test_run_id_stays_internal() {
        let json = serde_json::to_value(record("m")).unwrap();
        assert!(json.get("run_id").is_none());
        assert_eq!(json["status"], "training");
    }
}
