//! Training configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of model fitted for a target column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    /// Logistic classifier over the target's distinct values
    Classification,
    /// Ordinary least squares over a numeric target
    Regression,
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelType::Classification => write!(f, "classification"),
            ModelType::Regression => write!(f, "regression"),
        }
    }
}

impl FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "classification" => Ok(ModelType::Classification),
            "regression" => Ok(ModelType::Regression),
            other => Err(format!(
                "unknown model type '{other}', expected 'classification' or 'regression'"
            )),
        }
    }
}

/// Policy knobs for the training pipeline and its executor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSettings {
    /// A numeric target with at most this many distinct values is a classification target
    pub classification_max_distinct: usize,
    /// Gradient descent iteration cap for the logistic classifier
    pub logistic_max_iter: usize,
    /// Upper bound on fits running at the same time
    pub max_concurrent_trainings: usize,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            classification_max_distinct: 10,
            logistic_max_iter: 1000,
            max_concurrent_trainings: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

impl TrainingSettings {
    /// Defaults overridden by `CLASSIFICATION_MAX_DISTINCT`, `LOGISTIC_MAX_ITER`
    /// and `MAX_CONCURRENT_TRAININGS`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            classification_max_distinct: env_usize("CLASSIFICATION_MAX_DISTINCT")
                .unwrap_or(defaults.classification_max_distinct),
            logistic_max_iter: env_usize("LOGISTIC_MAX_ITER").unwrap_or(defaults.logistic_max_iter),
            max_concurrent_trainings: env_usize("MAX_CONCURRENT_TRAININGS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_concurrent_trainings),
        }
    }
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
