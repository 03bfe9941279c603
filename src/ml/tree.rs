//! CART regression tree
//!
//! Shared base learner for the bagged and boosted ensembles. Splits minimize
//! the summed squared error of the two children.

use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    /// `None` grows until leaves are pure or too small to split
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split; `None` uses all of them
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
}

#[derive(Debug, Clone)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Grow a tree on the rows of `x` listed in `indices` (duplicates allowed,
    /// which is how bootstrap samples are passed in).
    pub fn fit(x: &Array2<f64>, y: &[f64], indices: Vec<usize>, params: &TreeParams, rng: &mut StdRng) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(x, y, indices, 0, params, rng);
        tree
    }

    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }

    pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        x.rows().into_iter().map(|row| self.predict_row(row)).collect()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, left).max(walk(nodes, right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    fn grow(
        &mut self,
        x: &Array2<f64>,
        y: &[f64],
        indices: Vec<usize>,
        depth: usize,
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> usize {
        let mean = if indices.is_empty() {
            0.0
        } else {
            indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len() as f64
        };

        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf { value: mean });

        let depth_allowed = params.max_depth.map_or(true, |max| depth < max);
        if !depth_allowed || indices.len() < params.min_samples_split.max(2) {
            return idx;
        }

        let Some(split) = best_split(x, y, &indices, params, rng) else {
            return idx;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| x[[i, split.feature]] <= split.threshold);
        if left.is_empty() || right.is_empty() {
            return idx;
        }

        let left_idx = self.grow(x, y, left, depth + 1, params, rng);
        let right_idx = self.grow(x, y, right, depth + 1, params, rng);
        self.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: left_idx,
            right: right_idx,
        };
        idx
    }
}

fn best_split(
    x: &Array2<f64>,
    y: &[f64],
    indices: &[usize],
    params: &TreeParams,
    rng: &mut StdRng,
) -> Option<SplitCandidate> {
    let n = indices.len();
    let n_features = x.ncols();

    let mut features: Vec<usize> = (0..n_features).collect();
    if let Some(k) = params.max_features {
        if k < n_features {
            features.shuffle(rng);
            features.truncate(k.max(1));
        }
    }

    let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();
    let total_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
    let parent_sse = total_sq - total_sum * total_sum / n as f64;

    let min_leaf = params.min_samples_leaf.max(1);
    let mut best: Option<SplitCandidate> = None;
    let mut best_gain = f64::EPSILON * parent_sse.abs().max(1.0);

    let mut order = indices.to_vec();
    for &feature in &features {
        order.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for k in 0..n - 1 {
            let yi = y[order[k]];
            left_sum += yi;
            left_sq += yi * yi;

            let value = x[[order[k], feature]];
            let next = x[[order[k + 1], feature]];
            if value == next {
                continue;
            }

            let left_n = k + 1;
            let right_n = n - left_n;
            if left_n < min_leaf || right_n < min_leaf {
                continue;
            }

            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / left_n as f64)
                + (right_sq - right_sum * right_sum / right_n as f64);
            let gain = parent_sse - sse;

            if gain > best_gain {
                best_gain = gain;
                best = Some(SplitCandidate {
                    feature,
                    threshold: value + (next - value) / 2.0,
                });
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    #[test]
    fn test_tree_fits_step_function() {
        let x = array![[0.0], [1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = [1.0, 1.0, 1.0, 5.0, 5.0, 5.0];
        let mut rng = StdRng::seed_from_u64(1);

        let tree = RegressionTree::fit(&x, &y, (0..6).collect(), &TreeParams::default(), &mut rng);
        let pred = tree.predict(&x);

        for (p, t) in pred.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-12);
        }
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn test_max_depth_limits_growth() {
        let x = array![[0.0], [1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0]];
        let y = [0.0, 1.0, 4.0, 9.0, 16.0, 25.0, 36.0, 49.0];
        let mut rng = StdRng::seed_from_u64(1);
        let params = TreeParams {
            max_depth: Some(2),
            ..Default::default()
        };

        let tree = RegressionTree::fit(&x, &y, (0..8).collect(), &params, &mut rng);
        assert!(tree.depth() <= 2);
    }

    #[test]
    fn test_constant_target_is_single_leaf() {
        let x = array![[0.0, 1.0], [1.0, 0.0], [2.0, 3.0]];
        let y = [2.5, 2.5, 2.5];
        let mut rng = StdRng::seed_from_u64(1);

        let tree = RegressionTree::fit(&x, &y, (0..3).collect(), &TreeParams::default(), &mut rng);
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.predict_row(x.row(1)), 2.5);
    }

    #[test]
    fn test_identical_rows_do_not_split() {
        let x = array![[1.0], [1.0], [1.0]];
        let y = [0.0, 1.0, 2.0];
        let mut rng = StdRng::seed_from_u64(1);

        let tree = RegressionTree::fit(&x, &y, (0..3).collect(), &TreeParams::default(), &mut rng);
        assert_eq!(tree.depth(), 0);
        assert!((tree.predict_row(x.row(0)) - 1.0).abs() < 1e-12);
    }
}
