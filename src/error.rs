//! Error types for the Predictia service core

use thiserror::Error;

/// Result type alias for Predictia operations
pub type Result<T> = std::result::Result<T, PredictiaError>;

/// Main error type shared by the registry, the pipelines and the stores
#[derive(Error, Debug)]
pub enum PredictiaError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Model '{0}' not found")]
    NotFound(String),

    #[error("Model '{model_id}' is not ready (status: {status})")]
    NotReady { model_id: String, status: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Missing feature column '{column}' in row {row}")]
    MissingFeature { column: String, row: usize },

    #[error("Unknown category '{value}' for column '{column}'")]
    UnknownCategory { column: String, value: String },

    #[error("Invalid value for column '{column}' in row {row}: {reason}")]
    InvalidFeatureValue {
        column: String,
        row: usize,
        reason: String,
    },

    #[error("Column '{0}' contains nested values (lists or objects) and cannot be used as a feature")]
    NestedColumn(String),

    #[error("Artifact '{artifact}' for model '{model_id}' not found")]
    ArtifactNotFound { model_id: String, artifact: String },

    #[error("Training error: {0}")]
    Training(String),

    #[error("Computation error: {0}")]
    Computation(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Data error: {0}")]
    Data(String),
}

impl PredictiaError {
    /// Short machine-readable name of the error kind
    pub fn code(&self) -> &'static str {
        match self {
            PredictiaError::Validation(_) => "validation_error",
            PredictiaError::NotFound(_) => "not_found",
            PredictiaError::NotReady { .. } => "model_not_ready",
            PredictiaError::Conflict(_) => "conflict",
            PredictiaError::MissingFeature { .. } => "missing_feature",
            PredictiaError::UnknownCategory { .. } => "unknown_category",
            PredictiaError::InvalidFeatureValue { .. } => "invalid_feature_value",
            PredictiaError::NestedColumn(_) => "nested_column",
            PredictiaError::ArtifactNotFound { .. } => "artifact_not_found",
            PredictiaError::Training(_) => "training_error",
            PredictiaError::Computation(_) => "computation_error",
            PredictiaError::ModelNotFitted => "model_not_fitted",
            PredictiaError::ShapeError { .. } => "shape_error",
            PredictiaError::Io(_) => "io_error",
            PredictiaError::Serialization(_) => "serialization_error",
            PredictiaError::Data(_) => "data_error",
        }
    }
}

impl From<polars::error::PolarsError> for PredictiaError {
    fn from(err: polars::error::PolarsError) -> Self {
        PredictiaError::Data(err.to_string())
    }
}

impl From<serde_json::Error> for PredictiaError {
    fn from(err: serde_json::Error) -> Self {
        PredictiaError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for PredictiaError {
    fn from(err: bincode::Error) -> Self {
        PredictiaError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for PredictiaError {
    fn from(err: ndarray::ShapeError) -> Self {
        PredictiaError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PredictiaError::MissingFeature {
            column: "age".to_string(),
            row: 2,
        };
        assert_eq!(err.to_string(), "Missing feature column 'age' in row 2");
        assert_eq!(err.code(), "missing_feature");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PredictiaError = io_err.into();
        assert!(matches!(err, PredictiaError::Io(_)));
    }
}
