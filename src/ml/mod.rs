//! Machine learning scoring module
//!
//! Provides the ESG ensemble scorer with:
//! - CART regression trees as the shared base learner
//! - Bagged (random forest) and boosted tree ensembles
//! - A small feed-forward network
//! - Pluggable label providers for the training target

pub mod boosting;
pub mod ensemble;
pub mod forest;
pub mod labels;
pub mod network;
pub mod tree;


pub use boosting::GradientBoosting;
pub use ensemble::{EnsembleScorer, ModelScores, ScoreResult};
pub use forest::RandomForest;
pub use labels::{FixedLabelProvider, LabelProvider, UniformLabelProvider};
pub use network::{NetworkParams, NeuralNetwork};
pub use tree::{RegressionTree, TreeParams};

use crate::error::{EvalError, Result};
use ndarray::{Array1, Array2};

/// A regressor retrained from scratch on every scoring request
pub trait Regressor: Send {
    /// Model name for logging and error reports
    fn name(&self) -> &str;

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;
}

/// Shape and value checks every regressor runs before fitting
pub(crate) fn check_training_input(model: &str, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(EvalError::training(model, x.dim(), "empty training matrix"));
    }
    if y.len() != x.nrows() {
        return Err(EvalError::training(
            model,
            x.dim(),
            format!("label count mismatch: {} labels for {} rows", y.len(), x.nrows()),
        ));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(EvalError::training(model, x.dim(), "non-finite training values"));
    }
    Ok(())
}
