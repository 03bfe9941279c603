//! Isolation forest anomaly detector
//!
//! Random axis-aligned splits isolate unusual rows in fewer steps than rows
//! inside a dense cluster. The anomaly score of a row is
//! `2^(-E[h(x)] / c(ψ))`, where `h` is the path length to its leaf and `c(ψ)`
//! the expected path length of an unsuccessful BST search over the subsample
//! size `ψ`. Scores above 0.5 are labelled outliers.

use super::{AnomalyDetector, INLIER, OUTLIER};
use crate::error::{EvalError, Result};
use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Score threshold of the automatic contamination setting
pub const SCORE_THRESHOLD: f64 = 0.5;

enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn build(x: &Array2<f64>, rows: Vec<usize>, depth: usize, max_depth: usize, rng: &mut StdRng) -> Node {
        if depth >= max_depth || rows.len() <= 1 {
            return Node::Leaf { size: rows.len() };
        }

        // Only features that still vary inside the node can split it
        let candidates: Vec<(usize, f64, f64)> = (0..x.ncols())
            .filter_map(|feature| {
                let (min, max) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
                    let v = x[[r, feature]];
                    (lo.min(v), hi.max(v))
                });
                (min < max).then_some((feature, min, max))
            })
            .collect();

        let Some(&(feature, min, max)) = candidates.get(rng.random_range(0..candidates.len().max(1))) else {
            return Node::Leaf { size: rows.len() };
        };

        let threshold = rng.random_range(min..max);
        let (left, right): (Vec<usize>, Vec<usize>) = rows.into_iter().partition(|&r| x[[r, feature]] <= threshold);

        Node::Split {
            feature,
            threshold,
            left: Box::new(Node::build(x, left, depth + 1, max_depth, rng)),
            right: Box::new(Node::build(x, right, depth + 1, max_depth, rng)),
        }
    }

    fn path_length(&self, row: ArrayView1<f64>) -> f64 {
        let mut node = self;
        let mut depth = 0.0;
        loop {
            match node {
                Node::Leaf { size } => return depth + average_path_length(*size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                    depth += 1.0;
                }
            }
        }
    }
}

/// Expected path length `c(n)` of an unsuccessful search in a BST of `n` nodes
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let m = (n - 1) as f64;
            2.0 * (m.ln() + EULER_GAMMA) - 2.0 * m / n as f64
        }
    }
}

#[derive(Debug, Clone)]
pub struct IsolationForest {
    n_trees: usize,
    max_samples: usize,
    seed: u64,
}

impl IsolationForest {
    pub fn new(n_trees: usize, max_samples: usize, seed: u64) -> Self {
        Self {
            n_trees,
            max_samples,
            seed,
        }
    }

    /// Anomaly score in (0, 1] for every row; higher is more anomalous
    pub fn score_samples(&self, x: &Array2<f64>) -> Result<Vec<f64>> {
        let n = x.nrows();
        if n == 0 || x.ncols() == 0 {
            return Err(EvalError::computation(self.name(), x.dim(), "empty feature matrix"));
        }
        if self.n_trees == 0 || self.max_samples == 0 {
            return Err(EvalError::computation(
                self.name(),
                x.dim(),
                "n_trees and max_samples must be positive",
            ));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(EvalError::computation(self.name(), x.dim(), "non-finite features"));
        }

        let psi = self.max_samples.min(n);
        let max_depth = (psi as f64).log2().ceil().max(0.0) as usize;

        let trees: Vec<Node> = (0..self.n_trees)
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(t as u64));
                let mut rows: Vec<usize> = (0..n).collect();
                rows.shuffle(&mut rng);
                rows.truncate(psi);
                Node::build(x, rows, 0, max_depth, &mut rng)
            })
            .collect();

        let normalizer = average_path_length(psi);
        let scores = x
            .rows()
            .into_iter()
            .map(|row| {
                let mean_path = trees.iter().map(|tree| tree.path_length(row)).sum::<f64>() / trees.len() as f64;
                if normalizer > 0.0 {
                    2f64.powf(-mean_path / normalizer)
                } else {
                    SCORE_THRESHOLD
                }
            })
            .collect();
        Ok(scores)
    }
}

impl AnomalyDetector for IsolationForest {
    fn name(&self) -> &str {
        "isolation_forest"
    }

    fn fit_predict(&self, x: &Array2<f64>) -> Result<Vec<f64>> {
        let scores = self.score_samples(x)?;
        let labels: Vec<f64> = scores
            .iter()
            .map(|&s| if s > SCORE_THRESHOLD { OUTLIER } else { INLIER })
            .collect();
        tracing::debug!(
            rows = x.nrows(),
            outliers = labels.iter().filter(|&&l| l == OUTLIER).count(),
            "isolation forest labelled batch"
        );
        Ok(labels)
    }
}
