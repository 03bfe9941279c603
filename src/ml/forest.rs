//! Bagged regression trees (random forest)

use super::tree::{RegressionTree, TreeParams};
use super::{check_training_input, Regressor};
use crate::error::{EvalError, Result};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub struct RandomForest {
    n_trees: usize,
    params: TreeParams,
    seed: u64,
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    pub fn new(n_trees: usize, seed: u64) -> Self {
        Self {
            n_trees,
            params: TreeParams::default(),
            seed,
            trees: Vec::new(),
        }
    }

    pub fn with_params(mut self, params: TreeParams) -> Self {
        self.params = params;
        self
    }

    pub fn n_fitted(&self) -> usize {
        self.trees.len()
    }
}

impl Regressor for RandomForest {
    fn name(&self) -> &str {
        "random_forest"
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_input(self.name(), x, y)?;
        if self.n_trees == 0 {
            return Err(EvalError::training(self.name(), x.dim(), "n_trees must be positive"));
        }

        let n = x.nrows();
        let labels = y.to_vec();
        self.trees = (0..self.n_trees)
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(t as u64));
                let sample: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
                RegressionTree::fit(x, &labels, sample, &self.params, &mut rng)
            })
            .collect();
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(EvalError::training(self.name(), x.dim(), "model is not fitted"));
        }
        let mut total = Array1::<f64>::zeros(x.nrows());
        for tree in &self.trees {
            total += &tree.predict(x);
        }
        Ok(total / self.trees.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_forest_tracks_linear_trend() {
        let x = Array2::from_shape_fn((30, 1), |(i, _)| i as f64);
        let y = Array1::from_shape_fn(30, |i| 2.0 * i as f64);

        let mut forest = RandomForest::new(25, 42);
        forest.fit(&x, &y).unwrap();
        assert_eq!(forest.n_fitted(), 25);

        let pred = forest.predict(&array![[2.0], [27.0]]).unwrap();
        assert!(pred[1] > pred[0]);
    }

    #[test]
    fn test_forest_is_deterministic_for_seed() {
        let x = array![[0.0, 1.0], [1.0, 3.0], [2.0, 2.0], [3.0, 0.0]];
        let y = array![0.1, 0.7, 0.4, 0.9];

        let mut a = RandomForest::new(10, 3);
        let mut b = RandomForest::new(10, 3);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let forest = RandomForest::new(5, 1);
        assert!(forest.predict(&array![[1.0]]).is_err());
    }
}
