//! Feature preparation
//!
//! Z-score standardization of selected project metrics. Scaling is a pure
//! function of the current batch: nothing is fitted once and reused, so every
//! consumer re-derives its matrix from the dataset it is handed.

use crate::error::{Result, ValidationError};
use crate::types::{Dataset, Metric};
use ndarray::{Array1, Array2};

/// Columns fed to the ensemble scorer
pub const SCORING_COLUMNS: [Metric; 6] = [
    Metric::Co2Reduction,
    Metric::EnergySavings,
    Metric::SocialImpact,
    Metric::GovernanceScore,
    Metric::JobCreation,
    Metric::Investment,
];

/// Columns averaged into the optimizer's return proxy
pub const RETURN_COLUMNS: [Metric; 4] = [
    Metric::Co2Reduction,
    Metric::EnergySavings,
    Metric::SocialImpact,
    Metric::GovernanceScore,
];

/// Columns fed to the anomaly detectors
pub const RISK_COLUMNS: [Metric; 5] = [
    Metric::Co2Reduction,
    Metric::EnergySavings,
    Metric::Investment,
    Metric::SocialImpact,
    Metric::GovernanceScore,
];

/// Per-column statistics used to scale one batch
#[derive(Debug, Clone, PartialEq)]
pub struct ScalingParams {
    pub columns: Vec<Metric>,
    pub means: Vec<f64>,
    /// Population standard deviations
    pub std_devs: Vec<f64>,
}

impl ScalingParams {
    /// Columns that were constant over the batch and therefore scaled to 0
    pub fn constant_columns(&self) -> Vec<Metric> {
        self.columns
            .iter()
            .zip(&self.std_devs)
            .filter(|(_, sd)| **sd == 0.0)
            .map(|(m, _)| *m)
            .collect()
    }
}

/// Standardize `columns` of `dataset` to zero mean / unit variance.
///
/// Returns a matrix with one row per project (row order preserved) and one
/// column per requested metric. A column with zero standard deviation maps to
/// exactly 0.
pub fn standardize(dataset: &Dataset, columns: &[Metric]) -> Result<(Array2<f64>, ScalingParams)> {
    dataset.require_len(1)?;
    if columns.is_empty() {
        return Err(ValidationError::MissingColumn("<no columns requested>".to_string()).into());
    }

    let n = dataset.len();
    let mut matrix = Array2::<f64>::zeros((n, columns.len()));
    let mut means = Vec::with_capacity(columns.len());
    let mut std_devs = Vec::with_capacity(columns.len());

    for (j, metric) in columns.iter().enumerate() {
        let raw = Array1::from(dataset.column(*metric));
        let (scaled, mean, sd) = standardize_column(&raw);
        matrix.column_mut(j).assign(&scaled);
        means.push(mean);
        std_devs.push(sd);
    }

    let params = ScalingParams {
        columns: columns.to_vec(),
        means,
        std_devs,
    };

    let constant = params.constant_columns();
    if !constant.is_empty() {
        tracing::debug!(?constant, "constant columns standardized to zero");
    }

    Ok((matrix, params))
}

/// Standardize a single metric, returning one value per project
pub fn standardize_metric(dataset: &Dataset, metric: Metric) -> Result<Array1<f64>> {
    let (matrix, _) = standardize(dataset, &[metric])?;
    Ok(matrix.column(0).to_owned())
}

/// Min-max scale to [0, 1]; a constant sequence maps to 0
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let range = max - min;
    if !(range > 0.0) {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - min) / range).collect()
}

/// Heuristic score: `Σ weight · min-max(metric)` per project
pub fn weighted_score(dataset: &Dataset, weights: &[(Metric, f64)]) -> Result<Vec<f64>> {
    dataset.require_len(1)?;
    let mut scores = vec![0.0; dataset.len()];
    for (metric, weight) in weights {
        let normalized = min_max_normalize(&dataset.column(*metric));
        for (score, value) in scores.iter_mut().zip(normalized) {
            *score += weight * value;
        }
    }
    Ok(scores)
}

fn standardize_column(values: &Array1<f64>) -> (Array1<f64>, f64, f64) {
    let n = values.len() as f64;
    let mean = values.sum() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let sd = variance.sqrt();

    // Rounding can leave a tiny spread on a constant column
    if sd <= f64::EPSILON * mean.abs().max(1.0) {
        return (Array1::zeros(values.len()), mean, 0.0);
    }

    (values.mapv(|v| (v - mean) / sd), mean, sd)
}
