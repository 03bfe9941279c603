//! Gradient boosted regression trees on squared loss

use super::tree::{RegressionTree, TreeParams};
use super::{check_training_input, Regressor};
use crate::error::{EvalError, Result};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;

pub struct GradientBoosting {
    n_stages: usize,
    learning_rate: f64,
    params: TreeParams,
    seed: u64,
    init: f64,
    stages: Vec<RegressionTree>,
}

impl GradientBoosting {
    pub fn new(n_stages: usize, learning_rate: f64, max_depth: usize, seed: u64) -> Self {
        Self {
            n_stages,
            learning_rate,
            params: TreeParams {
                max_depth: Some(max_depth),
                ..Default::default()
            },
            seed,
            init: 0.0,
            stages: Vec::new(),
        }
    }

    pub fn n_fitted(&self) -> usize {
        self.stages.len()
    }
}

impl Regressor for GradientBoosting {
    fn name(&self) -> &str {
        "gradient_boosting"
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_input(self.name(), x, y)?;
        if !(self.learning_rate > 0.0) {
            return Err(EvalError::training(
                self.name(),
                x.dim(),
                format!("learning rate must be positive, got {}", self.learning_rate),
            ));
        }

        let n = x.nrows();
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.init = y.mean().unwrap_or(0.0);
        self.stages.clear();

        let mut current = Array1::from_elem(n, self.init);
        for _ in 0..self.n_stages {
            // Negative gradient of squared loss
            let residuals = (y - &current).to_vec();
            let tree = RegressionTree::fit(x, &residuals, (0..n).collect(), &self.params, &mut rng);
            current.scaled_add(self.learning_rate, &tree.predict(x));
            self.stages.push(tree);
        }

        if current.iter().any(|v| !v.is_finite()) {
            return Err(EvalError::training(self.name(), x.dim(), "non-finite training predictions"));
        }
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let mut out = Array1::from_elem(x.nrows(), self.init);
        for tree in &self.stages {
            out.scaled_add(self.learning_rate, &tree.predict(x));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_boosting_reduces_training_error() {
        let x = Array2::from_shape_fn((20, 2), |(i, j)| (i * (j + 1)) as f64);
        let y = Array1::from_shape_fn(20, |i| ((i as f64) * 0.3).sin());

        let mut weak = GradientBoosting::new(1, 0.1, 3, 42);
        let mut strong = GradientBoosting::new(100, 0.1, 3, 42);
        weak.fit(&x, &y).unwrap();
        strong.fit(&x, &y).unwrap();

        let mse = |pred: Array1<f64>| (&pred - &y).mapv(|e| e * e).mean().unwrap();
        assert!(mse(strong.predict(&x).unwrap()) < mse(weak.predict(&x).unwrap()));
        assert_eq!(strong.n_fitted(), 100);
    }

    #[test]
    fn test_zero_stages_predicts_mean() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![1.0, 2.0, 3.0, 6.0];

        let mut model = GradientBoosting::new(0, 0.1, 3, 42);
        model.fit(&x, &y).unwrap();
        let pred = model.predict(&x).unwrap();
        assert!(pred.iter().all(|p| (*p - 3.0).abs() < 1e-12));
    }

    #[test]
    fn test_invalid_learning_rate_is_training_error() {
        let x = array![[0.0], [1.0]];
        let y = array![0.0, 1.0];
        let mut model = GradientBoosting::new(10, 0.0, 3, 42);
        let err = model.fit(&x, &y).unwrap_err();
        assert!(matches!(err, EvalError::Training { ref model, .. } if model == "gradient_boosting"));
    }
}
