//! Feed-forward regression network
//!
//! ReLU hidden layers, identity output, squared loss with L2 penalty,
//! trained with Adam on shuffled mini-batches. Training stops early once the
//! epoch loss has not improved by `tol` for `patience` epochs.

use super::{check_training_input, Regressor};
use crate::error::{EvalError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const ADAM_EPSILON: f64 = 1e-8;
const MAX_BATCH: usize = 200;

#[derive(Debug, Clone)]
pub struct NetworkParams {
    pub hidden_layers: Vec<usize>,
    pub learning_rate: f64,
    pub l2_penalty: f64,
    pub max_epochs: usize,
    pub tol: f64,
    pub patience: usize,
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self {
            hidden_layers: vec![100, 50],
            learning_rate: 0.001,
            l2_penalty: 1e-4,
            max_epochs: 200,
            tol: 1e-4,
            patience: 10,
        }
    }
}

pub struct NeuralNetwork {
    params: NetworkParams,
    seed: u64,
    weights: Vec<Array2<f64>>,
    biases: Vec<Array1<f64>>,
    epochs_run: usize,
}

/// First and second moment estimates for one parameter tensor set
struct AdamState {
    m_w: Vec<Array2<f64>>,
    v_w: Vec<Array2<f64>>,
    m_b: Vec<Array1<f64>>,
    v_b: Vec<Array1<f64>>,
    step: i32,
}

impl AdamState {
    fn new(weights: &[Array2<f64>], biases: &[Array1<f64>]) -> Self {
        Self {
            m_w: weights.iter().map(|w| Array2::zeros(w.raw_dim())).collect(),
            v_w: weights.iter().map(|w| Array2::zeros(w.raw_dim())).collect(),
            m_b: biases.iter().map(|b| Array1::zeros(b.raw_dim())).collect(),
            v_b: biases.iter().map(|b| Array1::zeros(b.raw_dim())).collect(),
            step: 0,
        }
    }
}

impl NeuralNetwork {
    pub fn new(params: NetworkParams, seed: u64) -> Self {
        Self {
            params,
            seed,
            weights: Vec::new(),
            biases: Vec::new(),
            epochs_run: 0,
        }
    }

    pub fn epochs_run(&self) -> usize {
        self.epochs_run
    }

    fn init_layers(&mut self, n_inputs: usize, rng: &mut StdRng) {
        let mut sizes = Vec::with_capacity(self.params.hidden_layers.len() + 2);
        sizes.push(n_inputs);
        sizes.extend(self.params.hidden_layers.iter().copied());
        sizes.push(1);

        self.weights.clear();
        self.biases.clear();
        for pair in sizes.windows(2) {
            let (fan_in, fan_out) = (pair[0], pair[1]);
            // Glorot uniform
            let bound = (6.0 / (fan_in + fan_out) as f64).sqrt();
            self.weights
                .push(Array2::from_shape_fn((fan_in, fan_out), |_| rng.random_range(-bound..bound)));
            self.biases
                .push(Array1::from_shape_fn(fan_out, |_| rng.random_range(-bound..bound)));
        }
    }

    /// Activations of every layer, input included
    fn forward(&self, x: &Array2<f64>) -> Vec<Array2<f64>> {
        let last = self.weights.len() - 1;
        let mut activations = Vec::with_capacity(self.weights.len() + 1);
        activations.push(x.clone());
        for (layer, (w, b)) in self.weights.iter().zip(&self.biases).enumerate() {
            let z = activations[layer].dot(w) + b;
            let a = if layer == last { z } else { z.mapv(|v| v.max(0.0)) };
            activations.push(a);
        }
        activations
    }

    /// One Adam step on a mini-batch; returns the batch loss
    fn train_batch(&mut self, x: &Array2<f64>, y: &Array1<f64>, adam: &mut AdamState) -> f64 {
        let batch = x.nrows() as f64;
        let activations = self.forward(x);
        let output = activations[activations.len() - 1].column(0).to_owned();
        let error = &output - y;

        let l2: f64 = self.weights.iter().map(|w| w.mapv(|v| v * v).sum()).sum();
        let loss = error.mapv(|e| e * e).sum() / (2.0 * batch)
            + self.params.l2_penalty * l2 / (2.0 * batch);

        let mut delta = (error / batch).insert_axis(Axis(1));
        let mut grads_w = Vec::with_capacity(self.weights.len());
        let mut grads_b = Vec::with_capacity(self.biases.len());

        for layer in (0..self.weights.len()).rev() {
            let input = &activations[layer];
            let grad_w = input.t().dot(&delta) + &self.weights[layer] * (self.params.l2_penalty / batch);
            let grad_b = delta.sum_axis(Axis(0));
            if layer > 0 {
                let relu_grad = input.mapv(|a| if a > 0.0 { 1.0 } else { 0.0 });
                delta = delta.dot(&self.weights[layer].t()) * relu_grad;
            }
            grads_w.push(grad_w);
            grads_b.push(grad_b);
        }
        grads_w.reverse();
        grads_b.reverse();

        adam.step += 1;
        let lr = self.params.learning_rate * (1.0 - BETA2.powi(adam.step)).sqrt() / (1.0 - BETA1.powi(adam.step));

        for layer in 0..self.weights.len() {
            let g = &grads_w[layer];
            adam.m_w[layer] = &adam.m_w[layer] * BETA1 + g * (1.0 - BETA1);
            adam.v_w[layer] = &adam.v_w[layer] * BETA2 + g.mapv(|v| v * v) * (1.0 - BETA2);
            let denom = adam.v_w[layer].mapv(|v| v.sqrt() + ADAM_EPSILON);
            let update = &adam.m_w[layer] / &denom * lr;
            self.weights[layer] -= &update;

            let g = &grads_b[layer];
            adam.m_b[layer] = &adam.m_b[layer] * BETA1 + g * (1.0 - BETA1);
            adam.v_b[layer] = &adam.v_b[layer] * BETA2 + g.mapv(|v| v * v) * (1.0 - BETA2);
            let denom = adam.v_b[layer].mapv(|v| v.sqrt() + ADAM_EPSILON);
            let update = &adam.m_b[layer] / &denom * lr;
            self.biases[layer] -= &update;
        }

        loss
    }
}

impl Regressor for NeuralNetwork {
    fn name(&self) -> &str {
        "neural_network"
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_input(self.name(), x, y)?;
        if self.params.hidden_layers.iter().any(|&h| h == 0) {
            return Err(EvalError::training(self.name(), x.dim(), "hidden layers must be non-empty"));
        }

        let n = x.nrows();
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.init_layers(x.ncols(), &mut rng);
        let mut adam = AdamState::new(&self.weights, &self.biases);

        let batch_size = n.min(MAX_BATCH);
        let mut order: Vec<usize> = (0..n).collect();
        let mut best_loss = f64::INFINITY;
        let mut stale_epochs = 0;
        self.epochs_run = 0;

        for _ in 0..self.params.max_epochs {
            order.shuffle(&mut rng);
            let mut epoch_loss: f64 = 0.0;

            for chunk in order.chunks(batch_size) {
                let xb = x.select(Axis(0), chunk);
                let yb = y.select(Axis(0), chunk);
                epoch_loss += self.train_batch(&xb, &yb, &mut adam) * chunk.len() as f64;
            }
            epoch_loss /= n as f64;
            self.epochs_run += 1;

            if !epoch_loss.is_finite() {
                return Err(EvalError::training(
                    self.name(),
                    x.dim(),
                    format!("loss diverged after {} epochs", self.epochs_run),
                ));
            }

            if epoch_loss > best_loss - self.params.tol {
                stale_epochs += 1;
            } else {
                stale_epochs = 0;
            }
            best_loss = best_loss.min(epoch_loss);

            if stale_epochs > self.params.patience {
                tracing::debug!(epochs = self.epochs_run, loss = epoch_loss, "network training stopped early");
                break;
            }
        }

        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.weights.is_empty() {
            return Err(EvalError::training(self.name(), x.dim(), "model is not fitted"));
        }
        let activations = self.forward(x);
        Ok(activations[activations.len() - 1].column(0).to_owned())
    }
}
