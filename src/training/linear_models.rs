//! Linear model implementations

use super::labels::ClassLabel;
use crate::error::{PredictiaError, Result};
use crate::preprocessing::StandardScaler;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Cholesky factor L of a symmetric positive-definite matrix (A = L * L^T)
fn cholesky_factor(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }

            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    Some(l)
}

/// Solve Ax = b for symmetric positive-definite A using Cholesky decomposition.
/// Retries once with a small ridge on the diagonal if A is not positive definite.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    let l = match cholesky_factor(a) {
        Some(l) => l,
        None => {
            let ridge = (1e-8 * a.diag().iter().map(|v| v.abs()).sum::<f64>() / n as f64).max(1e-10);
            let mut a_reg = a.clone();
            for k in 0..n {
                a_reg[[k, k]] += ridge;
            }
            cholesky_factor(&a_reg)?
        }
    };

    // Forward substitution: L * y = b
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // Backward substitution: L^T * x = y
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

/// Matrix inversion using Gauss-Jordan elimination with partial pivoting
fn matrix_inverse(m: &Array2<f64>) -> Option<Array2<f64>> {
    let n = m.nrows();
    if n != m.ncols() {
        return None;
    }

    // Augmented matrix [M | I]
    let mut aug = Array2::zeros((n, 2 * n));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = m[[i, j]];
        }
        aug[[i, n + i]] = 1.0;
    }

    for col in 0..n {
        let mut max_row = col;
        for row in col + 1..n {
            if aug[[row, col]].abs() > aug[[max_row, col]].abs() {
                max_row = row;
            }
        }

        if max_row != col {
            for j in 0..2 * n {
                aug.swap([col, j], [max_row, j]);
            }
        }

        if aug[[col, col]].abs() < 1e-10 {
            return None;
        }

        let pivot = aug[[col, col]];
        for j in 0..2 * n {
            aug[[col, j]] /= pivot;
        }

        for row in 0..n {
            if row != col {
                let factor = aug[[row, col]];
                for j in 0..2 * n {
                    aug[[row, j]] -= factor * aug[[col, j]];
                }
            }
        }
    }

    Some(aug.slice(ndarray::s![.., n..]).to_owned())
}

/// Solve least squares via normal equations: (X^T X) w = X^T y
fn solve_least_squares(x: &Array2<f64>, y: &Array1<f64>) -> Option<Array1<f64>> {
    let xtx = x.t().dot(x);
    let xty = x.t().dot(y);

    if let Some(result) = cholesky_solve(&xtx, &xty) {
        return Some(result);
    }

    matrix_inverse(&xtx).map(|inv| inv.dot(&xty))
}

fn check_rows(x: &Array2<f64>, n_targets: usize) -> Result<()> {
    if x.nrows() != n_targets {
        return Err(PredictiaError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", n_targets),
        });
    }
    if x.nrows() == 0 {
        return Err(PredictiaError::Training("No training rows".to_string()));
    }
    Ok(())
}

/// Ordinary least squares regression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    /// Fitted coefficients (weights)
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept (bias)
    pub intercept: Option<f64>,
    pub is_fitted: bool,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearRegression {
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            is_fitted: false,
        }
    }

    /// Fit the model on centered data so the intercept is solved separately
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_rows(x, y.len())?;

        let x_mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| PredictiaError::Computation("Empty feature matrix".to_string()))?;
        let y_mean = y.mean().unwrap_or(0.0);

        let x_centered = x - &x_mean.view().insert_axis(Axis(0));
        let y_centered = y - y_mean;

        let coefficients = solve_least_squares(&x_centered, &y_centered).ok_or_else(|| {
            PredictiaError::Computation("Matrix is singular, cannot solve least squares".to_string())
        })?;

        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(PredictiaError::Computation(
                "Least squares produced non-finite coefficients".to_string(),
            ));
        }

        self.intercept = Some(y_mean - coefficients.dot(&x_mean));
        self.coefficients = Some(coefficients);
        self.is_fitted = true;

        Ok(self)
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = match &self.coefficients {
            Some(c) if self.is_fitted => c,
            _ => return Err(PredictiaError::ModelNotFitted),
        };

        if x.ncols() != coefficients.len() {
            return Err(PredictiaError::ShapeError {
                expected: format!("{} features", coefficients.len()),
                actual: format!("{} features", x.ncols()),
            });
        }

        Ok(x.dot(coefficients) + self.intercept.unwrap_or(0.0))
    }

    /// Get R² score
    pub fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        let y_pred = self.predict(x)?;

        let y_mean = y.mean().unwrap_or(0.0);
        let ss_res = (&y_pred - y).mapv(|v| v * v).sum();
        let ss_tot = y.mapv(|v| (v - y_mean) * (v - y_mean)).sum();

        if ss_tot == 0.0 {
            return Ok(1.0);
        }

        Ok(1.0 - ss_res / ss_tot)
    }
}

/// Binary logistic regression trained with batch gradient descent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub coefficients: Option<Array1<f64>>,
    pub intercept: Option<f64>,
    /// Regularization strength (L2)
    pub alpha: f64,
    pub max_iter: usize,
    /// Convergence tolerance on the gradient norm
    pub tol: f64,
    pub learning_rate: f64,
    pub is_fitted: bool,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            alpha: 0.01,
            max_iter: 1000,
            tol: 1e-6,
            learning_rate: 0.1,
            is_fitted: false,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    fn sigmoid(z: &Array1<f64>) -> Array1<f64> {
        z.mapv(|v| 1.0 / (1.0 + (-v).exp()))
    }

    /// Fit on 0/1 targets
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_rows(x, y.len())?;
        let n_samples = x.nrows() as f64;

        let mut weights = Array1::zeros(x.ncols());
        let mut bias = 0.0;

        for _ in 0..self.max_iter {
            let predictions = Self::sigmoid(&(x.dot(&weights) + bias));

            let errors = &predictions - y;
            let dw = (x.t().dot(&errors) / n_samples) + (self.alpha * &weights);
            let db = errors.mean().unwrap_or(0.0);

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.tol {
                break;
            }

            weights = weights - self.learning_rate * dw;
            bias -= self.learning_rate * db;
        }

        self.coefficients = Some(weights);
        self.intercept = Some(bias);
        self.is_fitted = true;

        Ok(self)
    }

    /// Probability of the positive class
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = match &self.coefficients {
            Some(c) if self.is_fitted => c,
            _ => return Err(PredictiaError::ModelNotFitted),
        };

        if x.ncols() != coefficients.len() {
            return Err(PredictiaError::ShapeError {
                expected: format!("{} features", coefficients.len()),
                actual: format!("{} features", x.ncols()),
            });
        }

        Ok(Self::sigmoid(&(x.dot(coefficients) + self.intercept.unwrap_or(0.0))))
    }
}

/// Multi-class logistic classifier over standardized features.
///
/// Two classes use a single binary model whose positive class is
/// `classes[1]`; more classes use one-vs-rest with an argmax over
/// per-class probabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticClassifier {
    classes: Vec<ClassLabel>,
    scaler: StandardScaler,
    estimators: Vec<LogisticRegression>,
    max_iter: usize,
}

impl LogisticClassifier {
    pub fn new(max_iter: usize) -> Self {
        Self {
            classes: Vec::new(),
            scaler: StandardScaler::new(),
            estimators: Vec::new(),
            max_iter,
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &[ClassLabel]) -> Result<&mut Self> {
        check_rows(x, y.len())?;

        let mut classes: Vec<ClassLabel> = y.to_vec();
        classes.sort();
        classes.dedup();
        if classes.len() < 2 {
            return Err(PredictiaError::Training(format!(
                "Classification needs at least two distinct target classes, found {}",
                classes.len()
            )));
        }

        let x_scaled = self.scaler.fit_transform(x)?;

        let targets: Vec<&ClassLabel> = if classes.len() == 2 {
            vec![&classes[1]]
        } else {
            classes.iter().collect()
        };

        let mut estimators = Vec::with_capacity(targets.len());
        for positive in targets {
            let y_binary: Array1<f64> =
                y.iter().map(|label| if label == positive { 1.0 } else { 0.0 }).collect();
            let mut model = LogisticRegression::new().with_max_iter(self.max_iter);
            model.fit(&x_scaled, &y_binary)?;
            estimators.push(model);
        }

        self.estimators = estimators;
        self.classes = classes;
        Ok(self)
    }

    /// Index into `classes` of the predicted class for each row
    pub fn predict_indices(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        if self.estimators.is_empty() {
            return Err(PredictiaError::ModelNotFitted);
        }
        let x_scaled = self.scaler.transform(x)?;

        if let [binary] = self.estimators.as_slice() {
            let proba = binary.predict_proba(&x_scaled)?;
            return Ok(proba.iter().map(|&p| usize::from(p >= 0.5)).collect());
        }

        let probas = self
            .estimators
            .iter()
            .map(|m| m.predict_proba(&x_scaled))
            .collect::<Result<Vec<_>>>()?;

        Ok((0..x.nrows())
            .map(|row| {
                let mut best = 0;
                for (k, proba) in probas.iter().enumerate() {
                    if proba[row] > probas[best][row] {
                        best = k;
                    }
                }
                best
            })
            .collect())
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<ClassLabel>> {
        Ok(self
            .predict_indices(x)?
            .into_iter()
            .map(|idx| self.classes[idx].clone())
            .collect())
    }

    /// Get accuracy score
    pub fn score(&self, x: &Array2<f64>, y: &[ClassLabel]) -> Result<f64> {
        let y_pred = self.predict(x)?;
        if y.is_empty() {
            return Ok(0.0);
        }
        let correct = y_pred.iter().zip(y).filter(|(pred, actual)| pred == actual).count();
        Ok(correct as f64 / y.len() as f64)
    }

    pub fn classes(&self) -> &[ClassLabel] {
        &self.classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_linear_regression() {
        let x = array![[1.0, 2.0], [2.0, 1.0], [3.0, 4.0], [4.0, 3.0], [5.0, 5.0]];
        // y = 2*x1 + 3*x2 + 1
        let y = array![9.0, 8.0, 19.0, 18.0, 26.0];

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        let coef = model.coefficients.as_ref().unwrap();
        assert!((coef[0] - 2.0).abs() < 1e-6);
        assert!((coef[1] - 3.0).abs() < 1e-6);
        assert!((model.intercept.unwrap() - 1.0).abs() < 1e-6);
        assert!(model.score(&x, &y).unwrap() > 0.999);
    }

    #[test]
    fn test_linear_regression_constant_column() {
        // Constant column leaves X^T X singular; the ridge retry keeps it solvable
        let x = array![[1.0, 7.0], [2.0, 7.0], [3.0, 7.0]];
        let y = array![2.0, 4.0, 6.0];

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        let preds = model.predict(&array![[4.0, 7.0]]).unwrap();
        assert!((preds[0] - 8.0).abs() < 1e-6);
    }

    #[test]
    fn test_predict_before_fit() {
        let model = LinearRegression::new();
        assert!(matches!(
            model.predict(&array![[1.0]]),
            Err(PredictiaError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_binary_classifier() {
        let x = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y: Vec<ClassLabel> = [0, 0, 0, 1, 1, 1].iter().map(|&v| ClassLabel::Int(v)).collect();

        let mut clf = LogisticClassifier::new(1000);
        clf.fit(&x, &y).unwrap();

        assert_eq!(clf.classes(), &[ClassLabel::Int(0), ClassLabel::Int(1)]);
        assert_eq!(clf.score(&x, &y).unwrap(), 1.0);
        assert_eq!(
            clf.predict(&array![[0.0], [13.0]]).unwrap(),
            vec![ClassLabel::Int(0), ClassLabel::Int(1)]
        );
    }

    #[test]
    fn test_one_vs_rest_classifier() {
        let x = array![
            [0.0, 0.0], [0.5, 0.2], [0.2, 0.4],
            [10.0, 0.0], [10.5, 0.3], [9.8, 0.1],
            [0.0, 10.0], [0.3, 10.4], [0.1, 9.7]
        ];
        let labels = ["low", "low", "low", "right", "right", "right", "up", "up", "up"];
        let y: Vec<ClassLabel> = labels.iter().map(|s| ClassLabel::Text(s.to_string())).collect();

        let mut clf = LogisticClassifier::new(1000);
        clf.fit(&x, &y).unwrap();

        assert_eq!(clf.classes().len(), 3);
        assert_eq!(clf.score(&x, &y).unwrap(), 1.0);
    }

    #[test]
    fn test_single_class_rejected() {
        let x = array![[1.0], [2.0]];
        let y = vec![ClassLabel::Bool(true), ClassLabel::Bool(true)];

        let mut clf = LogisticClassifier::new(1000);
        assert!(matches!(clf.fit(&x, &y), Err(PredictiaError::Training(_))));
    }
}
