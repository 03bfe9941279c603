//! # Portfolio Optimization Module
//!
//! Allocates capital across projects under a portfolio-level risk budget:
//! - Return proxy: mean of standardized CO2 reduction, energy savings,
//!   social impact and governance score
//! - Risk proxy: `1 - mean(standardized investment, standardized governance)`
//! - Objective: maximize `Σ w·return - Σ w·risk / risk_tolerance`
//! - Constraints: `Σ w = 1`, `Σ w·risk ≤ risk_tolerance`, `0 ≤ w ≤ 1`
//!
//! The result always reports whether the solver converged.
//!
//! ```rust,ignore
//! use esg_evaluator::portfolio::PortfolioOptimizer;
//!
//! let optimizer = PortfolioOptimizer::with_defaults();
//! let result = optimizer.optimize(&dataset, 0.5)?;
//! if !result.converged {
//!     tracing::warn!("allocation is a best-effort iterate");
//! }
//! ```

pub mod solver;

pub use solver::{LinearInequality, Objective, SolverError, SolverStatus, SqpOutcome, SqpSolver};

use crate::config::OptimizerConfig;
use crate::error::{EvalError, Result, ValidationError};
use crate::features::{standardize, standardize_metric, RETURN_COLUMNS};
use crate::types::{Dataset, Metric};
use ndarray::Axis;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

/// Minimum projects needed for variance-based proxies
pub const MIN_PORTFOLIO_PROJECTS: usize = 2;

/// Optimized allocation, row-aligned to the dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioResult {
    pub projects: Vec<String>,
    /// Weights in [0, 1]; sum to 1 within solver tolerance
    pub weights: Vec<f64>,
    pub converged: bool,
    pub iterations: usize,
    pub status: SolverStatus,
    pub risk_tolerance: f64,
    /// Σ w·return
    pub expected_return: f64,
    /// Σ w·risk
    pub portfolio_risk: f64,
}

/// Capital assigned to one project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalAllocation {
    pub project: String,
    pub weight: f64,
    pub amount: Decimal,
}

impl PortfolioResult {
    /// Weights clipped to [0, 1] and rescaled to sum to exactly 1
    pub fn normalized_weights(&self) -> Vec<f64> {
        let clipped: Vec<f64> = self.weights.iter().map(|w| w.clamp(0.0, 1.0)).collect();
        let sum: f64 = clipped.iter().sum();
        if sum > 0.0 {
            clipped.iter().map(|w| w / sum).collect()
        } else {
            let n = clipped.len().max(1) as f64;
            vec![1.0 / n; clipped.len()]
        }
    }

    /// Effective number of projects held (1 / Σw²)
    pub fn effective_n(&self) -> f64 {
        let sum_sq: f64 = self.normalized_weights().iter().map(|w| w * w).sum();
        if sum_sq > 0.0 {
            1.0 / sum_sq
        } else {
            0.0
        }
    }

    /// Split `budget` across projects by normalized weight.
    ///
    /// Amounts are rounded to cents; the rounding remainder goes to the
    /// largest position so the amounts add up to `budget` exactly.
    pub fn allocate_capital(&self, budget: Decimal) -> Vec<CapitalAllocation> {
        let weights = self.normalized_weights();
        let mut allocations: Vec<CapitalAllocation> = self
            .projects
            .iter()
            .zip(&weights)
            .map(|(project, &weight)| CapitalAllocation {
                project: project.clone(),
                weight,
                amount: (budget * Decimal::from_f64(weight).unwrap_or(Decimal::ZERO)).round_dp(2),
            })
            .collect();

        let assigned: Decimal = allocations.iter().map(|a| a.amount).sum();
        let remainder = budget - assigned;
        if !remainder.is_zero() {
            if let Some(largest) = allocations
                .iter_mut()
                .max_by(|a, b| a.weight.total_cmp(&b.weight))
            {
                largest.amount += remainder;
            }
        }
        allocations
    }
}

/// Linear ESG objective, negated for minimization
struct EsgObjective {
    coefficients: Vec<f64>,
}

impl EsgObjective {
    fn new(returns: &[f64], risks: &[f64], risk_tolerance: f64) -> Self {
        let coefficients = returns
            .iter()
            .zip(risks)
            .map(|(ret, risk)| -(ret - risk / risk_tolerance))
            .collect();
        Self { coefficients }
    }
}

impl Objective for EsgObjective {
    fn value(&self, x: &[f64]) -> f64 {
        x.iter().zip(&self.coefficients).map(|(w, c)| w * c).sum()
    }

    fn gradient(&self, _x: &[f64]) -> Vec<f64> {
        self.coefficients.clone()
    }
}

/// Portfolio optimizer
pub struct PortfolioOptimizer {
    config: OptimizerConfig,
}

impl PortfolioOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(OptimizerConfig::default())
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// ESG-driven stand-in for financial return, one value per project
    pub fn expected_returns(&self, dataset: &Dataset) -> Result<Vec<f64>> {
        dataset.require_len(MIN_PORTFOLIO_PROJECTS)?;
        let (matrix, _) = standardize(dataset, &RETURN_COLUMNS)?;
        let means = matrix
            .mean_axis(Axis(1))
            .ok_or_else(|| EvalError::computation("portfolio_optimizer", matrix.dim(), "empty return matrix"))?;
        Ok(means.to_vec())
    }

    /// Risk proxy per project: `1 - mean(std investment, std governance)`
    pub fn risks(&self, dataset: &Dataset) -> Result<Vec<f64>> {
        dataset.require_len(MIN_PORTFOLIO_PROJECTS)?;
        let investment = standardize_metric(dataset, Metric::Investment)?;
        let governance = standardize_metric(dataset, Metric::GovernanceScore)?;
        Ok(investment
            .iter()
            .zip(governance.iter())
            .map(|(i, g)| 1.0 - (i + g) / 2.0)
            .collect())
    }

    /// Solve for portfolio weights at the given risk tolerance
    pub fn optimize(&self, dataset: &Dataset, risk_tolerance: f64) -> Result<PortfolioResult> {
        if !(risk_tolerance > 0.0 && risk_tolerance <= 1.0) {
            return Err(ValidationError::InvalidRiskTolerance(risk_tolerance).into());
        }
        dataset.require_len(MIN_PORTFOLIO_PROJECTS)?;

        let returns = self.expected_returns(dataset)?;
        let risks = self.risks(dataset)?;
        let n = returns.len();

        let objective = EsgObjective::new(&returns, &risks, risk_tolerance);
        let constraint = LinearInequality {
            coefficients: risks.clone(),
            bound: risk_tolerance,
        };
        let solver = SqpSolver::new(self.config.max_iterations, self.config.tolerance);

        let outcome = solver
            .solve(&objective, &constraint, vec![1.0 / n as f64; n])
            .map_err(|e| EvalError::computation("portfolio_optimizer", (n, 2), e.to_string()))?;

        let converged = outcome.converged();
        if converged {
            tracing::info!(
                projects = n,
                iterations = outcome.iterations,
                risk_tolerance,
                "portfolio optimization converged"
            );
        } else {
            tracing::warn!(
                projects = n,
                iterations = outcome.iterations,
                status = ?outcome.status,
                violation = outcome.constraint_violation,
                "portfolio optimization did not converge, returning best iterate"
            );
        }

        let expected_return = dot(&outcome.x, &returns);
        let portfolio_risk = dot(&outcome.x, &risks);

        Ok(PortfolioResult {
            projects: dataset.names(),
            weights: outcome.x,
            converged,
            iterations: outcome.iterations,
            status: outcome.status,
            risk_tolerance,
            expected_return,
            portfolio_risk,
        })
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
