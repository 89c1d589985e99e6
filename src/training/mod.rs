//! Model training module
//!
//! Provides:
//! - Linear models (OLS regression, logistic classifier with one-vs-rest)
//! - Class label handling for classification targets
//! - The training pipeline that turns records into a fitted model

mod config;
pub mod labels;
pub mod linear_models;
pub mod pipeline;

pub use config::{ModelType, TrainingSettings};
pub use labels::ClassLabel;
pub use linear_models::{LinearRegression, LogisticClassifier, LogisticRegression};
pub use pipeline::{infer_model_type, run_training, TrainedModel, TrainingJob, TrainingOutcome};
