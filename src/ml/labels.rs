//! Training-target sources for the ensemble scorer
//!
//! There is no ground-truth ESG label, so the target vector is pluggable.

use crate::error::Result;
use crate::types::Dataset;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of one training target per project, in dataset row order
pub trait LabelProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &str;

    fn labels(&self, dataset: &Dataset) -> Result<Vec<f64>>;
}

/// Uniform [0, 1) draws, either fresh on every call or replayed from a seed
#[derive(Debug, Clone, Default)]
pub struct UniformLabelProvider {
    seed: Option<u64>,
}

impl UniformLabelProvider {
    /// New random labels on every call
    pub fn random() -> Self {
        Self { seed: None }
    }

    /// The same labels on every call for a dataset of a given size
    pub fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}

impl LabelProvider for UniformLabelProvider {
    fn name(&self) -> &str {
        match self.seed {
            Some(_) => "uniform_seeded",
            None => "uniform_random",
        }
    }

    fn labels(&self, dataset: &Dataset) -> Result<Vec<f64>> {
        let n = dataset.len();
        let labels = match self.seed {
            Some(seed) => draw(&mut StdRng::seed_from_u64(seed), n),
            None => draw(&mut rand::rng(), n),
        };
        Ok(labels)
    }
}

fn draw<R: Rng>(rng: &mut R, n: usize) -> Vec<f64> {
    (0..n).map(|_| rng.random::<f64>()).collect()
}

/// Caller-supplied labels, e.g. from an external rating source
#[derive(Debug, Clone)]
pub struct FixedLabelProvider {
    labels: Vec<f64>,
}

impl FixedLabelProvider {
    pub fn new(labels: Vec<f64>) -> Self {
        Self { labels }
    }
}

impl LabelProvider for FixedLabelProvider {
    fn name(&self) -> &str {
        "fixed"
    }

    fn labels(&self, _dataset: &Dataset) -> Result<Vec<f64>> {
        Ok(self.labels.clone())
    }
}
