//! Prediction pipeline

use crate::error::{PredictiaError, Result};
use crate::preprocessing::{build_prediction_frame, frame_to_matrix, FeatureColumn, LabelEncoder, Record};
use crate::training::TrainedModel;
use serde_json::Value;
use std::collections::BTreeMap;

/// Predict one value per input record, in input order.
///
/// `columns` carries the stored feature order and kinds; nothing is
/// re-inferred from `input`. Fails as a whole on the first bad row.
pub fn predict_records(
    columns: &[FeatureColumn],
    model: &TrainedModel,
    encoders: &BTreeMap<String, LabelEncoder>,
    input: &[Record],
) -> Result<Vec<Value>> {
    if input.is_empty() {
        return Err(PredictiaError::Validation("input_data must not be empty".to_string()));
    }

    let df = build_prediction_frame(input, columns)?;
    let x = frame_to_matrix(&df, columns, encoders)?;
    let predictions = model.predict(&x)?;

    if predictions.len() != input.len() {
        return Err(PredictiaError::ShapeError {
            expected: format!("{} predictions", input.len()),
            actual: format!("{} predictions", predictions.len()),
        });
    }

    Ok(predictions)
}
