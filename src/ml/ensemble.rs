//! ESG ensemble scorer
//!
//! Trains a random forest, a gradient boosting model and a feed-forward
//! network on the standardized project features and averages their
//! predictions. Nothing is kept between calls: every `score` refits all three
//! models against fresh labels from the configured [`LabelProvider`].

use super::boosting::GradientBoosting;
use super::forest::RandomForest;
use super::labels::{LabelProvider, UniformLabelProvider};
use super::network::{NetworkParams, NeuralNetwork};
use super::Regressor;
use crate::config::ScoringConfig;
use crate::error::Result;
use crate::features::{standardize, SCORING_COLUMNS};
use crate::types::Dataset;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Minimum projects needed to fit the ensemble
pub const MIN_SCORING_PROJECTS: usize = 2;

/// Predictions of one ensemble member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelScores {
    pub model: String,
    pub predictions: Vec<f64>,
}

/// Ensemble scores, row-aligned to the scored dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResult {
    pub projects: Vec<String>,
    /// Mean of the member predictions (unbounded)
    pub scores: Vec<f64>,
    pub models: Vec<ModelScores>,
    pub label_source: String,
}

impl ScoreResult {
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Projects ordered from highest to lowest score
    pub fn ranked(&self) -> Vec<(String, f64)> {
        let mut ranked: Vec<(String, f64)> = self
            .projects
            .iter()
            .cloned()
            .zip(self.scores.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }

    /// Spread of member predictions per project (max - min)
    pub fn disagreement(&self) -> Vec<f64> {
        (0..self.scores.len())
            .map(|i| {
                let values = self.models.iter().map(|m| m.predictions[i]);
                let max = values.clone().fold(f64::NEG_INFINITY, f64::max);
                let min = values.fold(f64::INFINITY, f64::min);
                if self.models.is_empty() {
                    0.0
                } else {
                    max - min
                }
            })
            .collect()
    }
}

pub struct EnsembleScorer {
    config: ScoringConfig,
    labels: Box<dyn LabelProvider>,
}

impl EnsembleScorer {
    /// Scorer with the label provider implied by `config.label_seed`
    pub fn new(config: ScoringConfig) -> Self {
        let labels: Box<dyn LabelProvider> = match config.label_seed {
            Some(seed) => Box::new(UniformLabelProvider::seeded(seed)),
            None => Box::new(UniformLabelProvider::random()),
        };
        Self { config, labels }
    }

    pub fn with_defaults() -> Self {
        Self::new(ScoringConfig::default())
    }

    pub fn with_label_provider(mut self, labels: Box<dyn LabelProvider>) -> Self {
        self.labels = labels;
        self
    }

    pub fn set_label_provider(&mut self, labels: Box<dyn LabelProvider>) {
        self.labels = labels;
    }

    pub fn label_source(&self) -> &str {
        self.labels.name()
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score every project in `dataset`
    pub fn score(&self, dataset: &Dataset) -> Result<ScoreResult> {
        dataset.require_len(MIN_SCORING_PROJECTS)?;

        let (x, _) = standardize(dataset, &SCORING_COLUMNS)?;
        let y = Array1::from(self.labels.labels(dataset)?);

        let mut models = Vec::with_capacity(3);
        for mut model in self.build_models() {
            let predictions = fit_predict(model.as_mut(), &x, &y)?;
            models.push(ModelScores {
                model: model.name().to_string(),
                predictions: predictions.to_vec(),
            });
        }

        let n = dataset.len();
        let scores: Vec<f64> = (0..n)
            .map(|i| models.iter().map(|m| m.predictions[i]).sum::<f64>() / models.len() as f64)
            .collect();

        tracing::info!(
            projects = n,
            label_source = self.labels.name(),
            "ensemble scoring complete"
        );

        Ok(ScoreResult {
            projects: dataset.names(),
            scores,
            models,
            label_source: self.labels.name().to_string(),
        })
    }

    fn build_models(&self) -> Vec<Box<dyn Regressor>> {
        let cfg = &self.config;
        let network = NetworkParams {
            hidden_layers: cfg.hidden_layers.clone(),
            learning_rate: cfg.nn_learning_rate,
            l2_penalty: cfg.l2_penalty,
            max_epochs: cfg.epochs,
            ..Default::default()
        };

        vec![
            Box::new(RandomForest::new(cfg.forest_trees, cfg.model_seed)),
            Box::new(GradientBoosting::new(
                cfg.boosting_stages,
                cfg.learning_rate,
                cfg.boosting_depth,
                cfg.model_seed,
            )),
            Box::new(NeuralNetwork::new(network, cfg.model_seed)),
        ]
    }
}

fn fit_predict(model: &mut dyn Regressor, x: &Array2<f64>, y: &Array1<f64>) -> Result<Array1<f64>> {
    let started = Instant::now();
    model.fit(x, y)?;
    let predictions = model.predict(x)?;
    tracing::debug!(
        model = model.name(),
        rows = x.nrows(),
        cols = x.ncols(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "model trained"
    );
    Ok(predictions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::FixedLabelProvider;
    use crate::types::ProjectRecord;

    fn fast_config() -> ScoringConfig {
        ScoringConfig {
            forest_trees: 10,
            boosting_stages: 10,
            hidden_layers: vec![8],
            epochs: 20,
            ..Default::default()
        }
    }

    fn dataset() -> Dataset {
        (0..6)
            .map(|i| ProjectRecord {
                name: format!("Project {}", i + 1),
                co2_reduction: 100.0 + 150.0 * i as f64,
                energy_savings: 10.0 + 7.0 * i as f64,
                job_creation: 10 + 15 * i,
                social_impact: 1.0 + i as f64,
                governance_score: 5.0 + 0.8 * i as f64,
                investment: 1.0 + 1.5 * i as f64,
            })
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn test_score_shape_and_member_count() {
        let scorer = EnsembleScorer::new(fast_config());
        let result = scorer.score(&dataset()).unwrap();

        assert_eq!(result.len(), 6);
        assert_eq!(result.models.len(), 3);
        assert_eq!(result.projects[0], "Project 1");
        assert!(result.scores.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_score_is_mean_of_members() {
        let scorer = EnsembleScorer::new(fast_config());
        let result = scorer.score(&dataset()).unwrap();

        for i in 0..result.len() {
            let mean = result.models.iter().map(|m| m.predictions[i]).sum::<f64>() / 3.0;
            assert!((result.scores[i] - mean).abs() < 1e-12);
        }
    }

    #[test]
    fn test_label_length_mismatch_names_model() {
        let scorer = EnsembleScorer::new(fast_config())
            .with_label_provider(Box::new(FixedLabelProvider::new(vec![0.5; 3])));

        let err = scorer.score(&dataset()).unwrap_err();
        match err {
            crate::error::EvalError::Training { model, rows, cols, .. } => {
                assert_eq!(model, "random_forest");
                assert_eq!((rows, cols), (6, 6));
            }
            other => panic!("expected training error, got {other:?}"),
        }
    }

    #[test]
    fn test_ranked_orders_descending() {
        let result = ScoreResult {
            projects: vec!["A".into(), "B".into(), "C".into()],
            scores: vec![0.2, 0.9, 0.5],
            models: vec![],
            label_source: "fixed".into(),
        };
        let ranked = result.ranked();
        assert_eq!(ranked[0].0, "B");
        assert_eq!(ranked[2].0, "A");
        assert_eq!(result.disagreement(), vec![0.0, 0.0, 0.0]);
    }
}
