//! Ordinary least squares on standardized features.
//!
//! Solves the normal equations `β = (X'X)^(-1) X'y` with a Cholesky
//! decomposition. Columns without variance keep a zero coefficient and are
//! left out of the system.

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use super::Regressor;
use crate::dataset::Dataset;
use crate::error::ModelError;

/// Columns with a smaller standard deviation are treated as constant.
const MIN_SCALE: f64 = 1e-12;
/// Added to the diagonal of `X'X` for numerical stability.
const RIDGE: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    means: Vec<f64>,
    scales: Vec<f64>,
    /// Coefficients on the standardized features
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LinearModel {
    /// # Errors
    /// Returns `ModelError::EmptyDataset` for an empty `train` and
    /// `ModelError::SingularMatrix` if the normal equations cannot be solved.
    pub fn fit(train: &Dataset) -> Result<Self, ModelError> {
        let n = train.n_samples();
        if n == 0 {
            return Err(ModelError::EmptyDataset);
        }
        let p = train.n_features();
        let x = train.features.mapv(f64::from);
        let y = Array1::from(train.targets_f64());

        let mut means = vec![0.0; p];
        let mut scales = vec![0.0; p];
        for (j, column) in x.columns().into_iter().enumerate() {
            let mean = column.sum() / n as f64;
            let variance = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
            means[j] = mean;
            scales[j] = variance.sqrt();
        }

        let active: Vec<usize> = (0..p).filter(|&j| scales[j] > MIN_SCALE).collect();

        // design matrix: intercept column then the active standardized columns
        let mut design = Array2::<f64>::ones((n, active.len() + 1));
        for (k, &j) in active.iter().enumerate() {
            for i in 0..n {
                design[[i, k + 1]] = (x[[i, j]] - means[j]) / scales[j];
            }
        }

        let xt = design.t();
        let mut xtx = xt.dot(&design);
        let xty = xt.dot(&y);
        for i in 0..xtx.nrows() {
            xtx[[i, i]] += RIDGE;
        }
        let beta = cholesky_solve(&xtx, &xty)?;

        let mut coefficients = vec![0.0; p];
        for (k, &j) in active.iter().enumerate() {
            coefficients[j] = beta[k + 1];
        }
        for (j, scale) in scales.iter_mut().enumerate() {
            if !active.contains(&j) {
                *scale = 1.0;
            }
        }

        tracing::debug!(
            features = p,
            constant_columns = p - active.len(),
            "Fitted linear model"
        );
        Ok(Self {
            means,
            scales,
            coefficients,
            intercept: beta[0],
        })
    }
}

impl Regressor for LinearModel {
    fn predict_row(&self, row: ArrayView1<'_, f32>) -> f64 {
        let mut prediction = self.intercept;
        for (j, &value) in row.iter().enumerate() {
            let Some(coefficient) = self.coefficients.get(j) else {
                break;
            };
            prediction += coefficient * (f64::from(value) - self.means[j]) / self.scales[j];
        }
        prediction
    }
}

/// Solves `a · x = b` for symmetric positive definite `a`.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>, ModelError> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    // A = L * L^T
    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }

            if i == j {
                let diag = a[[i, i]] - sum;
                // also rejects NaN
                if !(diag > 0.0) {
                    return Err(ModelError::SingularMatrix);
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L * z = b
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * z[j];
        }
        z[i] = (b[i] - sum) / l[[i, i]];
    }

    // L^T * x = z
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (z[i] - sum) / l[[i, i]];
    }

    Ok(x)
}
