//! ESG Project Evaluator
//!
//! Scores green investment projects, allocates capital across them under a
//! risk budget and flags anomalous projects.
//!
//! ## Architecture
//!
//! ```text
//!                        ┌→ EnsembleScorer     (ml)
//! Dataset → Evaluator ───┼→ PortfolioOptimizer (portfolio)
//!    ↑                   └→ RiskAnalyzer       (risk)
//!    │                          ↑
//! data (CSV / sample)     features (standardize)
//! ```
//!
//! Every component re-derives its features from the dataset it is handed;
//! nothing fitted is kept between calls.

pub mod config;
pub mod data;
pub mod error;
pub mod evaluator;
pub mod features;
pub mod ml;
pub mod portfolio;
pub mod risk;
pub mod types;

#[cfg(test)]
mod config_tests;
#[cfg(test)]
mod types_tests;

pub use config::Config;
pub use error::{EvalError, Result, ValidationError};
pub use evaluator::{EvaluationReport, Evaluator, EvaluatorHandle};
pub use types::{Dataset, Metric, ProjectRecord};
