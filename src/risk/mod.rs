//! # Risk Analysis Module
//!
//! Two anomaly detectors label every project inlier (+1) or outlier (-1):
//! - Isolation forest ([`IsolationForest`])
//! - Elliptic envelope over a minimum covariance determinant fit
//!   ([`EllipticEnvelope`])
//!
//! Each label sequence is min-max scaled to a risk in [0, 1] and the two are
//! averaged into the composite risk. Environmental and financial risks are
//! simple heuristics over standardized metrics.

pub mod envelope;
pub mod isolation;
pub mod linalg;

pub use envelope::{EllipticEnvelope, McdEstimate};
pub use isolation::IsolationForest;

use crate::config::RiskConfig;
use crate::error::Result;
use crate::features::{standardize, standardize_metric, RISK_COLUMNS};
use crate::types::{Dataset, Metric};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

pub const INLIER: f64 = 1.0;
pub const OUTLIER: f64 = -1.0;

/// Minimum projects needed for variance-based features
pub const MIN_RISK_PROJECTS: usize = 2;

/// Detector producing an inlier/outlier label per row
pub trait AnomalyDetector {
    fn name(&self) -> &str;

    /// Fit on `x` and label each of its rows [`INLIER`] or [`OUTLIER`]
    fn fit_predict(&self, x: &Array2<f64>) -> Result<Vec<f64>>;
}

/// Per-project risks, row-aligned to the analyzed dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskReport {
    pub projects: Vec<String>,
    /// Mean of the normalized detector risks, in [0, 1]
    pub composite: Vec<f64>,
    pub environmental: Vec<f64>,
    pub financial: Vec<f64>,
    pub isolation_labels: Vec<f64>,
    pub envelope_labels: Vec<f64>,
}

impl RiskReport {
    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Projects whose composite risk is at least `threshold`
    pub fn flagged(&self, threshold: f64) -> Vec<&str> {
        self.projects
            .iter()
            .zip(&self.composite)
            .filter(|(_, risk)| **risk >= threshold)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Map detector labels to risk: `(max - label) / (max - min)`.
///
/// A batch where every label agrees carries no ranking, so every risk is 0.
pub fn normalize_labels(labels: &[f64]) -> Vec<f64> {
    let max = labels.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = labels.iter().copied().fold(f64::INFINITY, f64::min);
    let range = max - min;
    if !(range > 0.0) {
        return vec![0.0; labels.len()];
    }
    labels.iter().map(|l| (max - l) / range).collect()
}

pub struct RiskAnalyzer {
    config: RiskConfig,
}

impl RiskAnalyzer {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(RiskConfig::default())
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    fn detectors(&self) -> (IsolationForest, EllipticEnvelope) {
        let cfg = &self.config;
        (
            IsolationForest::new(cfg.isolation_trees, cfg.max_samples, cfg.seed),
            EllipticEnvelope::new(cfg.contamination, cfg.mcd_starts, cfg.seed),
        )
    }

    pub fn analyze(&self, dataset: &Dataset) -> Result<RiskReport> {
        dataset.require_len(MIN_RISK_PROJECTS)?;

        let (features, _) = standardize(dataset, &RISK_COLUMNS)?;
        let (forest, envelope) = self.detectors();

        let isolation_labels = forest.fit_predict(&features)?;
        let envelope_labels = envelope.fit_predict(&features)?;

        let composite: Vec<f64> = normalize_labels(&isolation_labels)
            .iter()
            .zip(normalize_labels(&envelope_labels))
            .map(|(a, b)| (a + b) / 2.0)
            .collect();

        let environmental = heuristic_risk(dataset, Metric::Co2Reduction, Metric::EnergySavings)?;
        let financial = heuristic_risk(dataset, Metric::Investment, Metric::GovernanceScore)?;

        let report = RiskReport {
            projects: dataset.names(),
            composite,
            environmental,
            financial,
            isolation_labels,
            envelope_labels,
        };

        let flagged = report.flagged(self.config.flag_threshold).len();
        tracing::info!(projects = report.len(), flagged, "risk analysis complete");
        Ok(report)
    }
}

/// `1 - mean(standardized a, standardized b)`
fn heuristic_risk(dataset: &Dataset, a: Metric, b: Metric) -> Result<Vec<f64>> {
    let first = standardize_metric(dataset, a)?;
    let second = standardize_metric(dataset, b)?;
    Ok(first
        .iter()
        .zip(second.iter())
        .map(|(x, y)| 1.0 - (x + y) / 2.0)
        .collect())
}
