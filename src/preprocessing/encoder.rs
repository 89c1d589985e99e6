//! Categorical label encoding

use crate::error::{PredictiaError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Label encoder for a single categorical column.
///
/// Classes are the distinct observed values sorted lexicographically; the
/// value at position `i` encodes to `i`. Sorting keeps the encoding stable
/// across retrains on the same data regardless of row order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    column: String,
    classes: Vec<String>,
    is_fitted: bool,
}

impl LabelEncoder {
    /// Create an unfitted encoder for `column`
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            classes: Vec::new(),
            is_fitted: false,
        }
    }

    /// Fit the encoder on a string series
    pub fn fit(&mut self, series: &Series) -> Result<&mut Self> {
        let ca = series
            .str()
            .map_err(|e| PredictiaError::Data(e.to_string()))?;

        let distinct: BTreeSet<&str> = ca.into_iter().flatten().collect();
        self.fit_values(distinct)
    }

    /// Fit the encoder directly from values
    pub fn fit_values<'a, I>(&mut self, values: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let distinct: BTreeSet<&str> = values.into_iter().collect();
        if distinct.is_empty() {
            return Err(PredictiaError::Training(format!(
                "Column '{}' has no values to encode",
                self.column
            )));
        }

        self.classes = distinct.into_iter().map(str::to_string).collect();
        self.is_fitted = true;
        Ok(self)
    }

    /// Encode a single value
    pub fn encode(&self, value: &str) -> Result<usize> {
        if !self.is_fitted {
            return Err(PredictiaError::ModelNotFitted);
        }

        self.classes
            .binary_search_by(|class| class.as_str().cmp(value))
            .map_err(|_| PredictiaError::UnknownCategory {
                column: self.column.clone(),
                value: value.to_string(),
            })
    }

    /// Transform a string series into encoded values
    pub fn transform(&self, series: &Series) -> Result<Vec<f64>> {
        let ca = series
            .str()
            .map_err(|e| PredictiaError::Data(e.to_string()))?;

        ca.into_iter()
            .enumerate()
            .map(|(row, value)| match value {
                Some(v) => self.encode(v).map(|idx| idx as f64),
                None => Err(PredictiaError::MissingFeature {
                    column: self.column.clone(),
                    row,
                }),
            })
            .collect()
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, series: &Series) -> Result<Vec<f64>> {
        self.fit(series)?;
        self.transform(series)
    }

    /// Map an encoded value back to its category
    pub fn decode(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}
