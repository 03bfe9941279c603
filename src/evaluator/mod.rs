//! Evaluation session
//!
//! [`Evaluator`] holds the current dataset and hands it to the scorer, the
//! optimizer and the risk analyzer. Each operation re-derives its own
//! features; no intermediate result is shared between operations.
//!
//! [`EvaluatorHandle`] wraps an evaluator for shared use: `ingest` takes the
//! write lock, every computation a read lock.

#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::error::{EvalError, Result};
use crate::features::weighted_score;
use crate::ml::{EnsembleScorer, LabelProvider, ScoreResult};
use crate::portfolio::{CapitalAllocation, PortfolioOptimizer, PortfolioResult, SolverStatus};
use crate::risk::{RiskAnalyzer, RiskReport};
use crate::types::{Dataset, DatasetSummary};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// One project's line in an [`EvaluationReport`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRow {
    pub project: String,
    pub score: f64,
    pub weighted_score: f64,
    pub weight: f64,
    pub allocation: Decimal,
    pub composite_risk: f64,
    pub environmental_risk: f64,
    pub financial_risk: f64,
}

/// Scores, allocation and risks for every project at one risk tolerance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub risk_tolerance: f64,
    pub converged: bool,
    pub iterations: usize,
    pub status: SolverStatus,
    pub label_source: String,
    pub capital_budget: Decimal,
    pub summary: DatasetSummary,
    pub rows: Vec<EvaluationRow>,
}

impl EvaluationReport {
    /// Rows whose composite risk is at least `threshold`
    pub fn flagged(&self, threshold: f64) -> Vec<&EvaluationRow> {
        self.rows.iter().filter(|r| r.composite_risk >= threshold).collect()
    }
}

pub struct Evaluator {
    dataset: Option<Dataset>,
    scorer: EnsembleScorer,
    optimizer: PortfolioOptimizer,
    risk: RiskAnalyzer,
}

impl Evaluator {
    pub fn new(config: &Config) -> Self {
        Self {
            dataset: None,
            scorer: EnsembleScorer::new(config.scoring.clone()),
            optimizer: PortfolioOptimizer::new(config.optimizer.clone()),
            risk: RiskAnalyzer::new(config.risk.clone()),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(&Config::default())
    }

    pub fn with_label_provider(mut self, labels: Box<dyn LabelProvider>) -> Self {
        self.scorer.set_label_provider(labels);
        self
    }

    pub fn set_label_provider(&mut self, labels: Box<dyn LabelProvider>) {
        self.scorer.set_label_provider(labels);
    }

    /// Validate and replace the current dataset.
    ///
    /// On failure the previous dataset stays in place.
    pub fn ingest(&mut self, dataset: Dataset) -> Result<()> {
        dataset.validate()?;
        tracing::info!(projects = dataset.len(), "dataset ingested");
        self.dataset = Some(dataset);
        Ok(())
    }

    pub fn has_data(&self) -> bool {
        self.dataset.is_some()
    }

    pub fn current_dataset(&self) -> Result<&Dataset> {
        self.dataset
            .as_ref()
            .ok_or_else(|| EvalError::State("no dataset has been ingested".to_string()))
    }

    pub fn score(&self) -> Result<ScoreResult> {
        self.scorer.score(self.current_dataset()?)
    }

    pub fn optimize(&self, risk_tolerance: f64) -> Result<PortfolioResult> {
        self.optimizer.optimize(self.current_dataset()?, risk_tolerance)
    }

    pub fn analyze_risk(&self) -> Result<RiskReport> {
        self.risk.analyze(self.current_dataset()?)
    }

    /// Return proxy per project, as used by the optimizer
    pub fn expected_returns(&self) -> Result<Vec<f64>> {
        self.optimizer.expected_returns(self.current_dataset()?)
    }

    /// Risk proxy per project, as used by the optimizer
    pub fn risks(&self) -> Result<Vec<f64>> {
        self.optimizer.risks(self.current_dataset()?)
    }

    /// Heuristic weighted ESG score per project
    pub fn weighted_scores(&self) -> Result<Vec<f64>> {
        let weights = self.scorer.config().weights.pairs();
        weighted_score(self.current_dataset()?, &weights)
    }

    pub fn summary(&self) -> Result<DatasetSummary> {
        Ok(self.current_dataset()?.summary())
    }

    /// Run all three analyses and join them per project
    pub fn evaluate_all(&self, risk_tolerance: f64) -> Result<EvaluationReport> {
        let dataset = self.current_dataset()?;
        let scores = self.scorer.score(dataset)?;
        let portfolio = self.optimizer.optimize(dataset, risk_tolerance)?;
        let risk = self.risk.analyze(dataset)?;
        let weighted = self.weighted_scores()?;

        let budget = self.optimizer.config().capital_budget;
        let allocations: Vec<CapitalAllocation> = portfolio.allocate_capital(budget);

        let rows = dataset
            .names()
            .into_iter()
            .enumerate()
            .map(|(i, project)| EvaluationRow {
                project,
                score: scores.scores[i],
                weighted_score: weighted[i],
                weight: allocations[i].weight,
                allocation: allocations[i].amount,
                composite_risk: risk.composite[i],
                environmental_risk: risk.environmental[i],
                financial_risk: risk.financial[i],
            })
            .collect();

        let report = EvaluationReport {
            id: Uuid::new_v4(),
            generated_at: Utc::now(),
            risk_tolerance,
            converged: portfolio.converged,
            iterations: portfolio.iterations,
            status: portfolio.status,
            label_source: scores.label_source,
            capital_budget: budget,
            summary: dataset.summary(),
            rows,
        };
        tracing::info!(
            report_id = %report.id,
            projects = report.rows.len(),
            converged = report.converged,
            "evaluation report built"
        );
        Ok(report)
    }
}

/// Shared evaluator session
#[derive(Clone)]
pub struct EvaluatorHandle {
    inner: Arc<RwLock<Evaluator>>,
}

impl EvaluatorHandle {
    pub fn new(evaluator: Evaluator) -> Self {
        Self {
            inner: Arc::new(RwLock::new(evaluator)),
        }
    }

    pub fn ingest(&self, dataset: Dataset) -> Result<()> {
        self.inner.write().ingest(dataset)
    }

    pub fn set_label_provider(&self, labels: Box<dyn LabelProvider>) {
        self.inner.write().set_label_provider(labels);
    }

    pub fn has_data(&self) -> bool {
        self.inner.read().has_data()
    }

    /// Snapshot of the current dataset
    pub fn current_dataset(&self) -> Result<Dataset> {
        self.inner.read().current_dataset().cloned()
    }

    pub fn score(&self) -> Result<ScoreResult> {
        self.inner.read().score()
    }

    pub fn optimize(&self, risk_tolerance: f64) -> Result<PortfolioResult> {
        self.inner.read().optimize(risk_tolerance)
    }

    pub fn analyze_risk(&self) -> Result<RiskReport> {
        self.inner.read().analyze_risk()
    }

    pub fn weighted_scores(&self) -> Result<Vec<f64>> {
        self.inner.read().weighted_scores()
    }

    pub fn summary(&self) -> Result<DatasetSummary> {
        self.inner.read().summary()
    }

    pub fn evaluate_all(&self, risk_tolerance: f64) -> Result<EvaluationReport> {
        self.inner.read().evaluate_all(risk_tolerance)
    }
}

impl From<Evaluator> for EvaluatorHandle {
    fn from(evaluator: Evaluator) -> Self {
        Self::new(evaluator)
    }
}
