//! Small dense linear algebra for covariance estimates

use ndarray::{Array1, Array2, Axis};
use thiserror::Error;

const PIVOT_TOLERANCE: f64 = 1e-12;
const RIDGE_ATTEMPTS: usize = 12;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LinalgError {
    #[error("Matrix is not square: {0}x{1}")]
    NotSquare(usize, usize),

    #[error("Matrix is singular")]
    Singular,

    #[error("Empty sample")]
    EmptySample,
}

/// Inverse and log-determinant of a symmetric positive matrix
#[derive(Debug, Clone)]
pub struct Inversion {
    pub inverse: Array2<f64>,
    pub log_det: f64,
    /// Ridge added to the diagonal before inverting (0 when not needed)
    pub ridge: f64,
}

/// Gauss-Jordan inversion with partial pivoting
pub fn invert(matrix: &Array2<f64>) -> Result<Inversion, LinalgError> {
    let (rows, cols) = matrix.dim();
    if rows != cols {
        return Err(LinalgError::NotSquare(rows, cols));
    }
    let n = rows;

    // Augmented matrix [A|I]
    let mut aug = Array2::<f64>::zeros((n, 2 * n));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = matrix[[i, j]];
        }
        aug[[i, n + i]] = 1.0;
    }

    let scale = matrix.iter().fold(0.0f64, |m, v| m.max(v.abs())).max(1.0);
    let mut log_det: f64 = 0.0;

    for col in 0..n {
        let mut max_row = col;
        let mut max_val = aug[[col, col]].abs();
        for row in (col + 1)..n {
            if aug[[row, col]].abs() > max_val {
                max_val = aug[[row, col]].abs();
                max_row = row;
            }
        }

        if !max_val.is_finite() || max_val < PIVOT_TOLERANCE * scale {
            return Err(LinalgError::Singular);
        }

        if max_row != col {
            for j in 0..(2 * n) {
                aug.swap([col, j], [max_row, j]);
            }
        }

        let pivot = aug[[col, col]];
        log_det += pivot.abs().ln();
        for j in 0..(2 * n) {
            aug[[col, j]] /= pivot;
        }

        let col_row = aug.row(col).to_owned();
        for row in 0..n {
            if row != col {
                let factor = aug[[row, col]];
                if factor != 0.0 {
                    for j in 0..(2 * n) {
                        aug[[row, j]] -= factor * col_row[j];
                    }
                }
            }
        }
    }

    let inverse = aug.slice(ndarray::s![.., n..]).to_owned();
    Ok(Inversion {
        inverse,
        log_det,
        ridge: 0.0,
    })
}

/// Invert, adding a growing ridge to the diagonal while the matrix is singular
pub fn invert_regularized(matrix: &Array2<f64>) -> Result<Inversion, LinalgError> {
    match invert(matrix) {
        Ok(inversion) => return Ok(inversion),
        Err(LinalgError::Singular) => {}
        Err(e) => return Err(e),
    }

    let n = matrix.nrows();
    let mean_diag = if n == 0 { 0.0 } else { matrix.diag().sum() / n as f64 };
    let mut ridge = 1e-6 * mean_diag.abs().max(1.0);

    for _ in 0..RIDGE_ATTEMPTS {
        let mut regularized = matrix.clone();
        for i in 0..n {
            regularized[[i, i]] += ridge;
        }
        if let Ok(mut inversion) = invert(&regularized) {
            tracing::debug!(ridge, dim = n, "covariance regularized");
            inversion.ridge = ridge;
            return Ok(inversion);
        }
        ridge *= 10.0;
    }
    Err(LinalgError::Singular)
}

/// Mean and maximum-likelihood covariance of the selected rows
pub fn location_covariance(x: &Array2<f64>, rows: &[usize]) -> Result<(Array1<f64>, Array2<f64>), LinalgError> {
    if rows.is_empty() {
        return Err(LinalgError::EmptySample);
    }
    let subset = x.select(Axis(0), rows);
    let location = subset.mean_axis(Axis(0)).ok_or(LinalgError::EmptySample)?;
    let centered = &subset - &location.view().insert_axis(Axis(0));
    let covariance = centered.t().dot(&centered) / rows.len() as f64;
    Ok((location, covariance))
}

/// Squared Mahalanobis distance of every row
pub fn mahalanobis(x: &Array2<f64>, location: &Array1<f64>, precision: &Array2<f64>) -> Array1<f64> {
    let centered = x - &location.view().insert_axis(Axis(0));
    let projected = centered.dot(precision);
    (&projected * &centered).sum_axis(Axis(1))
}
