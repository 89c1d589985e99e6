//! Inference module
//!
//! Reapplies the preprocessing fixed at training time and runs the stored
//! model over new records.

pub mod pipeline;

pub use pipeline::predict_records;
