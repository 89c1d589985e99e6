//! Predictia - tabular model training and prediction service
//!
//! Trains classification and regression models from JSON records, keeps a
//! persistent registry of them and serves predictions over REST.
//!
//! # Modules
//!
//! - [`preprocessing`] - Column typing, frame construction, label encoding, scaling
//! - [`training`] - Model type inference and linear/logistic estimators
//! - [`inference`] - Applying a trained model to new records
//! - [`registry`] - Model metadata, artifacts and the training lifecycle
//! - [`content`] - Gemini-backed similarity, caption and summary services
//! - [`server`] - HTTP server with REST API
//! - [`cli`] - Command-line interface

pub mod error;

pub mod preprocessing;
pub mod training;
pub mod inference;
pub mod registry;

pub mod content;

pub mod server;
pub mod cli;

pub use error::{PredictiaError, Result};
