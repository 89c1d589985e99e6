//! Training pipeline: records in, fitted model and encoders out

use super::config::{ModelType, TrainingSettings};
use super::labels::ClassLabel;
use super::linear_models::{LinearRegression, LogisticClassifier};
use crate::error::{PredictiaError, Result};
use crate::preprocessing::{
    build_training_frame, fit_encoders, frame_to_matrix, infer_feature_columns, partition_columns,
    LabelEncoder, Record,
};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;
use tracing::debug;

/// A validated training request
#[derive(Debug, Clone)]
pub struct TrainingJob {
    pub model_id: String,
    pub training_data: Vec<Record>,
    pub feature_cols: Vec<String>,
    pub target_col: String,
    pub model_type: Option<ModelType>,
}

/// A fitted model of either kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainedModel {
    Classification(LogisticClassifier),
    Regression(LinearRegression),
}

impl TrainedModel {
    pub fn model_type(&self) -> ModelType {
        match self {
            TrainedModel::Classification(_) => ModelType::Classification,
            TrainedModel::Regression(_) => ModelType::Regression,
        }
    }

    /// Predict one JSON value per matrix row.
    ///
    /// Regression yields floats; classification yields the trained labels.
    /// A regression output that overflows to a non-finite value is an error,
    /// never a JSON `null`.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<Value>> {
        match self {
            TrainedModel::Classification(clf) => {
                Ok(clf.predict(x)?.iter().map(ClassLabel::to_json).collect())
            }
            TrainedModel::Regression(reg) => reg
                .predict(x)?
                .iter()
                .enumerate()
                .map(|(row, &v)| {
                    if v.is_finite() {
                        Ok(Value::from(v))
                    } else {
                        Err(PredictiaError::Computation(format!("Non-finite prediction in row {row}")))
                    }
                })
                .collect(),
        }
    }
}

/// Everything a successful run produces
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: TrainedModel,
    pub encoders: BTreeMap<String, LabelEncoder>,
    pub categorical_cols: Vec<String>,
    pub numerical_cols: Vec<String>,
    pub model_type: ModelType,
    pub n_samples: usize,
    /// In-sample R² for regression, accuracy for classification
    pub training_score: f64,
}

/// Decide the model type from the target values.
///
/// Any string or boolean target is a classification target, as is a numeric
/// target with at most `max_distinct` distinct values.
pub fn infer_model_type(targets: &[&Value], max_distinct: usize) -> ModelType {
    if targets
        .iter()
        .any(|v| matches!(v, Value::String(_) | Value::Bool(_)))
    {
        return ModelType::Classification;
    }

    let distinct: BTreeSet<u64> = targets
        .iter()
        .filter_map(|v| v.as_f64())
        .map(|f| if f == 0.0 { 0.0f64.to_bits() } else { f.to_bits() })
        .collect();

    if distinct.len() <= max_distinct {
        ModelType::Classification
    } else {
        ModelType::Regression
    }
}

/// Run one training job to completion.
///
/// Pure with respect to its inputs: nothing is persisted here.
pub fn run_training(job: &TrainingJob, settings: &TrainingSettings) -> Result<TrainingOutcome> {
    let start = Instant::now();
    let records = &job.training_data;

    let targets: Vec<&Value> = records
        .iter()
        .enumerate()
        .map(|(row, r)| match r.get(&job.target_col) {
            None | Some(Value::Null) => Err(PredictiaError::Training(format!(
                "Target column '{}' is missing in row {}",
                job.target_col, row
            ))),
            Some(v) => Ok(v),
        })
        .collect::<Result<_>>()?;

    let columns = infer_feature_columns(records, &job.feature_cols)?;
    let (categorical_cols, numerical_cols) = partition_columns(&columns);

    let df = build_training_frame(records, &columns)?;
    let encoders = fit_encoders(&df, &columns)?;
    let x = frame_to_matrix(&df, &columns, &encoders)?;

    let model_type = job
        .model_type
        .unwrap_or_else(|| infer_model_type(&targets, settings.classification_max_distinct));

    let (model, training_score) = match model_type {
        ModelType::Classification => {
            let labels = targets
                .iter()
                .map(|v| ClassLabel::from_json(v))
                .collect::<Result<Vec<_>>>()?;
            let mut clf = LogisticClassifier::new(settings.logistic_max_iter);
            clf.fit(&x, &labels)?;
            let score = clf.score(&x, &labels)?;
            (TrainedModel::Classification(clf), score)
        }
        ModelType::Regression => {
            let y: Array1<f64> = targets
                .iter()
                .enumerate()
                .map(|(row, v)| match v {
                    Value::Number(n) => n.as_f64().ok_or_else(|| {
                        PredictiaError::Training(format!("Unrepresentable target in row {row}"))
                    }),
                    other => Err(PredictiaError::Training(format!(
                        "Regression target '{}' must be numeric, got {} in row {}",
                        job.target_col, other, row
                    ))),
                })
                .collect::<Result<_>>()?;
            let mut reg = LinearRegression::new();
            reg.fit(&x, &y)?;
            let score = reg.score(&x, &y)?;
            (TrainedModel::Regression(reg), score)
        }
    };

    debug!(
        model_id = %job.model_id,
        rows = records.len(),
        features = columns.len(),
        model_type = %model_type,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Fit finished"
    );

    Ok(TrainingOutcome {
        model,
        encoders,
        categorical_cols,
        numerical_cols,
        model_type,
        n_samples: records.len(),
        training_score,
    })
}
