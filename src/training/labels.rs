//! Class labels for classification targets

use crate::error::{PredictiaError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// A target class as it appeared in the training JSON.
///
/// Labels keep their JSON kind so predictions echo back `1`, `true` or
/// `"churned"` exactly as trained. Integral floats collapse to `Int`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClassLabel {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ClassLabel {
    /// Read a label from a scalar JSON value
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(ClassLabel::Bool(*b)),
            Value::String(s) => Ok(ClassLabel::Text(s.clone())),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    return Ok(ClassLabel::Int(i));
                }
                let f = n
                    .as_f64()
                    .ok_or_else(|| PredictiaError::Data(format!("Unrepresentable number {n}")))?;
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                    Ok(ClassLabel::Int(f as i64))
                } else {
                    Ok(ClassLabel::Float(f))
                }
            }
            Value::Null => Err(PredictiaError::Data("Target value is null".to_string())),
            Value::Array(_) | Value::Object(_) => Err(PredictiaError::Data(
                "Target values must be scalars".to_string(),
            )),
        }
    }

    /// JSON form returned to callers
    pub fn to_json(&self) -> Value {
        match self {
            ClassLabel::Bool(b) => Value::Bool(*b),
            ClassLabel::Int(i) => Value::from(*i),
            ClassLabel::Float(f) => Value::from(*f),
            ClassLabel::Text(s) => Value::String(s.clone()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            ClassLabel::Bool(_) => 0,
            ClassLabel::Int(_) | ClassLabel::Float(_) => 1,
            ClassLabel::Text(_) => 2,
        }
    }
}

impl PartialEq for ClassLabel {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ClassLabel {}

impl PartialOrd for ClassLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ClassLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        use ClassLabel::*;
        match (self, other) {
            (Bool(a), Bool(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (Int(a), Float(b)) => (*a as f64).total_cmp(b),
            (Float(a), Int(b)) => a.total_cmp(&(*b as f64)),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}
