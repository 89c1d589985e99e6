//! Feature scaling for the encoded feature matrix

use crate::error::{PredictiaError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Z-score scaler over matrix columns: (x - mean) / std
///
/// Constant columns keep a scale of 1 so they map to zero instead of NaN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Option<Array1<f64>>,
    scale: Option<Array1<f64>>,
    is_fitted: bool,
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardScaler {
    pub fn new() -> Self {
        Self {
            mean: None,
            scale: None,
            is_fitted: false,
        }
    }

    /// Fit the scaler to the data
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        let mean = x.mean_axis(Axis(0)).ok_or_else(|| {
            PredictiaError::Computation("Cannot fit scaler on an empty matrix".to_string())
        })?;
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s.is_finite() && s > 1e-12 { s } else { 1.0 });

        self.mean = Some(mean);
        self.scale = Some(scale);
        self.is_fitted = true;
        Ok(self)
    }

    /// Scale a matrix with the fitted parameters
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (mean, scale) = match (&self.mean, &self.scale) {
            (Some(m), Some(s)) if self.is_fitted => (m, s),
            _ => return Err(PredictiaError::ModelNotFitted),
        };

        if x.ncols() != mean.len() {
            return Err(PredictiaError::ShapeError {
                expected: format!("{} columns", mean.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        Ok((x - &mean.view().insert_axis(Axis(0))) / &scale.view().insert_axis(Axis(0)))
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}
