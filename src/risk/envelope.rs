//! Elliptic envelope anomaly detector
//!
//! Fits a robust Gaussian with a minimum covariance determinant (MCD)
//! estimate: several random h-subsets are refined by concentration steps
//! (C-steps) and the subset with the smallest covariance determinant wins.
//! Rows whose Mahalanobis distance lies above the `1 - contamination`
//! percentile of all distances are labelled outliers.

use super::linalg::{invert_regularized, location_covariance, mahalanobis, LinalgError};
use super::{AnomalyDetector, INLIER, OUTLIER};
use crate::error::{EvalError, Result};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

const MAX_C_STEPS: usize = 30;

/// Robust location/scatter estimate
#[derive(Debug, Clone)]
pub struct McdEstimate {
    pub location: Array1<f64>,
    pub precision: Array2<f64>,
    pub log_det: f64,
    /// Squared Mahalanobis distance of every row
    pub distances: Array1<f64>,
    pub support: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct EllipticEnvelope {
    contamination: f64,
    n_starts: usize,
    seed: u64,
}

impl EllipticEnvelope {
    pub fn new(contamination: f64, n_starts: usize, seed: u64) -> Self {
        Self {
            contamination,
            n_starts,
            seed,
        }
    }

    /// Support size `h = ceil((n + p + 1) / 2)`, capped at `n`
    pub fn support_size(n: usize, p: usize) -> usize {
        (n + p + 1).div_ceil(2).min(n)
    }

    /// Minimum covariance determinant fit over all rows of `x`
    pub fn fit(&self, x: &Array2<f64>) -> Result<McdEstimate> {
        let (n, p) = x.dim();
        if n == 0 || p == 0 {
            return Err(EvalError::computation(self.name(), x.dim(), "empty feature matrix"));
        }
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(EvalError::computation(
                self.name(),
                x.dim(),
                format!("contamination must be in (0, 0.5], got {}", self.contamination),
            ));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(EvalError::computation(self.name(), x.dim(), "non-finite features"));
        }

        let h = Self::support_size(n, p);
        let linalg = |e: LinalgError| EvalError::computation("elliptic_envelope", x.dim(), e.to_string());

        if h == n {
            let all: Vec<usize> = (0..n).collect();
            return estimate(x, all).map_err(linalg);
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<McdEstimate> = None;
        for _ in 0..self.n_starts.max(1) {
            let mut rows: Vec<usize> = (0..n).collect();
            rows.shuffle(&mut rng);
            rows.truncate(h);
            rows.sort_unstable();

            let candidate = concentrate(x, rows, h).map_err(linalg)?;
            if best.as_ref().map_or(true, |b| candidate.log_det < b.log_det) {
                best = Some(candidate);
            }
        }

        best.ok_or_else(|| EvalError::computation(self.name(), x.dim(), "no MCD candidate"))
    }
}

impl AnomalyDetector for EllipticEnvelope {
    fn name(&self) -> &str {
        "elliptic_envelope"
    }

    fn fit_predict(&self, x: &Array2<f64>) -> Result<Vec<f64>> {
        let estimate = self.fit(x)?;
        let distances = estimate.distances.to_vec();
        let cutoff = percentile(&distances, 100.0 * (1.0 - self.contamination));

        let labels: Vec<f64> = distances
            .iter()
            .map(|&d| if d > cutoff { OUTLIER } else { INLIER })
            .collect();
        tracing::debug!(
            rows = x.nrows(),
            support = estimate.support.len(),
            cutoff,
            outliers = labels.iter().filter(|&&l| l == OUTLIER).count(),
            "elliptic envelope labelled batch"
        );
        Ok(labels)
    }
}

fn estimate(x: &Array2<f64>, support: Vec<usize>) -> std::result::Result<McdEstimate, LinalgError> {
    let (location, covariance) = location_covariance(x, &support)?;
    let inversion = invert_regularized(&covariance)?;
    let distances = mahalanobis(x, &location, &inversion.inverse);
    Ok(McdEstimate {
        location,
        precision: inversion.inverse,
        log_det: inversion.log_det,
        distances,
        support,
    })
}

/// C-steps: refit on the `h` closest rows until the determinant stops falling
fn concentrate(x: &Array2<f64>, mut support: Vec<usize>, h: usize) -> std::result::Result<McdEstimate, LinalgError> {
    let mut best: Option<McdEstimate> = None;
    for _ in 0..MAX_C_STEPS {
        let current = estimate(x, support)?;
        if let Some(previous) = &best {
            if current.log_det >= previous.log_det - 1e-12 {
                break;
            }
        }

        let mut order: Vec<usize> = (0..x.nrows()).collect();
        order.sort_by(|&a, &b| current.distances[a].total_cmp(&current.distances[b]));
        order.truncate(h);
        order.sort_unstable();

        let unchanged = order == current.support;
        support = order;
        best = Some(current);
        if unchanged {
            break;
        }
    }
    best.ok_or(LinalgError::EmptySample)
}

/// Percentile with linear interpolation between closest ranks
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cloud_with_outlier() -> Array2<f64> {
        let mut x = Array2::from_shape_fn((20, 2), |(i, j)| {
            let t = i as f64 * 0.7 + j as f64 * 1.3;
            t.sin() + if j == 1 { 0.3 * t.cos() } else { 0.0 }
        });
        x[[7, 0]] = 12.0;
        x[[7, 1]] = -9.0;
        x
    }

    #[test]
    fn test_support_size() {
        assert_eq!(EllipticEnvelope::support_size(20, 5), 13);
        assert_eq!(EllipticEnvelope::support_size(3, 5), 3);
        assert_eq!(EllipticEnvelope::support_size(10, 1), 6);
    }

    #[test]
    fn test_percentile_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&v, 50.0), 3.0);
        assert!((percentile(&v, 90.0) - 4.6).abs() < 1e-12);
        assert_eq!(percentile(&v, 100.0), 5.0);
    }

    #[test]
    fn test_gross_outlier_is_flagged() {
        let envelope = EllipticEnvelope::new(0.1, 30, 42);
        let x = cloud_with_outlier();
        let labels = envelope.fit_predict(&x).unwrap();

        assert_eq!(labels[7], OUTLIER);
        // 90th percentile of 20 distances leaves exactly two rows above it
        assert_eq!(labels.iter().filter(|&&l| l == OUTLIER).count(), 2);
    }

    #[test]
    fn test_outlier_is_excluded_from_support() {
        let envelope = EllipticEnvelope::new(0.1, 30, 42);
        let fit = envelope.fit(&cloud_with_outlier()).unwrap();
        assert!(!fit.support.contains(&7));
        assert_eq!(fit.support.len(), 12);
    }

    #[test]
    fn test_two_rows_are_symmetric() {
        // Both rows sit at the same distance from their mean
        let envelope = EllipticEnvelope::new(0.1, 30, 42);
        let x = ndarray::array![[-1.0, 0.5, 2.0], [1.0, -0.5, -2.0]];
        let labels = envelope.fit_predict(&x).unwrap();
        assert_eq!(labels, vec![INLIER, INLIER]);
    }

    #[test]
    fn test_invalid_contamination() {
        let envelope = EllipticEnvelope::new(0.9, 30, 42);
        let err = envelope.fit(&cloud_with_outlier()).unwrap_err();
        assert!(matches!(err, EvalError::Computation { .. }));
    }
}
