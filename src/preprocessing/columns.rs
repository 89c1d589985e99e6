//! Column typing for tabular JSON records

use crate::error::{PredictiaError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single row of tabular input
pub type Record = serde_json::Map<String, Value>;

/// Fill value for missing categorical training values
pub const MISSING_CATEGORY: &str = "__MISSING__";

/// Role of a feature column, decided once at training time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numerical,
    Categorical,
}

/// A feature column together with its inferred kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureColumn {
    pub name: String,
    pub kind: ColumnKind,
}

impl FeatureColumn {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Classify a column across all records.
///
/// Any string value makes the column categorical. Numbers, booleans and
/// nulls keep it numerical. A list or object anywhere fails the column.
pub fn infer_column_kind(records: &[Record], column: &str) -> Result<ColumnKind> {
    let mut kind = ColumnKind::Numerical;

    for value in records.iter().filter_map(|r| r.get(column)) {
        match value {
            Value::Array(_) | Value::Object(_) => {
                return Err(PredictiaError::NestedColumn(column.to_string()));
            }
            Value::String(_) => kind = ColumnKind::Categorical,
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }

    Ok(kind)
}

/// Classify every column, preserving the given order
pub fn infer_feature_columns(records: &[Record], columns: &[String]) -> Result<Vec<FeatureColumn>> {
    columns
        .iter()
        .map(|name| Ok(FeatureColumn::new(name.clone(), infer_column_kind(records, name)?)))
        .collect()
}

/// Split typed columns into (categorical, numerical) names, keeping order
pub fn partition_columns(columns: &[FeatureColumn]) -> (Vec<String>, Vec<String>) {
    let mut categorical = Vec::new();
    let mut numerical = Vec::new();
    for col in columns {
        match col.kind {
            ColumnKind::Categorical => categorical.push(col.name.clone()),
            ColumnKind::Numerical => numerical.push(col.name.clone()),
        }
    }
    (categorical, numerical)
}

/// Rebuild typed columns from a stored partition, in `feature_cols` order
pub fn columns_from_partition(
    feature_cols: &[String],
    categorical_cols: &[String],
) -> Vec<FeatureColumn> {
    feature_cols
        .iter()
        .map(|name| {
            let kind = if categorical_cols.contains(name) {
                ColumnKind::Categorical
            } else {
                ColumnKind::Numerical
            };
            FeatureColumn::new(name.clone(), kind)
        })
        .collect()
}

/// Numeric reading of a scalar: numbers as-is, booleans as 0/1
pub fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Text reading of a scalar in a categorical column.
///
/// Strings are taken verbatim; numbers and booleans use their JSON text so
/// `3` and `"3"` land in the same category. Integral floats are written as
/// integers first, so `3.0` joins them too.
pub fn category_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < MAX_EXACT_INT => {
                Some(format!("{}", f as i64))
            }
            _ => Some(n.to_string()),
        },
        Value::Bool(_) => Some(value.to_string()),
        _ => None,
    }
}

/// Largest magnitude below which every integral f64 is exact (2^53)
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;
