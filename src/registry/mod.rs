//! Model registry
//!
//! The catalog of models (`metadata`), their persisted artifacts
//! (`artifacts`), and the lifecycle that ties them to the training and
//! prediction pipelines (`lifecycle`).

pub mod artifacts;
pub mod lifecycle;
pub mod metadata;

pub use artifacts::ArtifactStore;
pub use lifecycle::{validate_model_id, validate_request, Registry, TrainingRequest};
pub use metadata::{MetadataStore, ModelMetadata, ModelStatus, INTERRUPTED_MESSAGE};
