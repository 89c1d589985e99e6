//! Data preprocessing module
//!
//! Turns tabular JSON records into numeric matrices:
//! - Column typing (numerical vs categorical), decided once at training time
//! - Polars frame construction with training-time fills
//! - Label encoding of categorical columns
//! - Standard scaling of the encoded matrix

pub mod columns;
pub mod encoder;
pub mod frame;
pub mod scaler;

pub use columns::{
    columns_from_partition, infer_column_kind, infer_feature_columns, partition_columns,
    ColumnKind, FeatureColumn, Record, MISSING_CATEGORY,
};
pub use encoder::LabelEncoder;
pub use frame::{build_prediction_frame, build_training_frame, fit_encoders, frame_to_matrix};
pub use scaler::StandardScaler;
