//! Configuration loading
//!
//! Layers an optional TOML file under `ESG__`-prefixed environment variables,
//! e.g. `ESG__OPTIMIZER__RISK_TOLERANCE=0.3`.

use crate::error::Result;
use crate::types::Metric;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub data: DataConfig,
}

impl Config {
    /// Load configuration from `path` (optional) and the environment
    pub fn load(path: &str) -> Result<Self> {
        dotenvy::dotenv().ok();

        let expanded = shellexpand::tilde(path).into_owned();
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&expanded).required(false))
            .add_source(
                config::Environment::with_prefix("ESG")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        tracing::debug!(path = %expanded, "configuration loaded");
        Ok(config)
    }
}

/// Ensemble scorer hyper-parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_forest_trees")]
    pub forest_trees: usize,
    #[serde(default = "default_boosting_stages")]
    pub boosting_stages: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_boosting_depth")]
    pub boosting_depth: usize,
    #[serde(default = "default_hidden_layers")]
    pub hidden_layers: Vec<usize>,
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    #[serde(default = "default_nn_learning_rate")]
    pub nn_learning_rate: f64,
    #[serde(default = "default_l2_penalty")]
    pub l2_penalty: f64,
    #[serde(default = "default_seed")]
    pub model_seed: u64,
    /// Seed for the uniform label provider; unset means fresh labels per call
    #[serde(default)]
    pub label_seed: Option<u64>,
    #[serde(default)]
    pub weights: EsgWeights,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            forest_trees: default_forest_trees(),
            boosting_stages: default_boosting_stages(),
            learning_rate: default_learning_rate(),
            boosting_depth: default_boosting_depth(),
            hidden_layers: default_hidden_layers(),
            epochs: default_epochs(),
            nn_learning_rate: default_nn_learning_rate(),
            l2_penalty: default_l2_penalty(),
            model_seed: default_seed(),
            label_seed: None,
            weights: EsgWeights::default(),
        }
    }
}

/// Metric weights of the heuristic weighted score
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EsgWeights {
    pub co2_reduction: f64,
    pub energy_savings: f64,
    pub job_creation: f64,
    pub social_impact: f64,
    pub governance_score: f64,
}

impl Default for EsgWeights {
    fn default() -> Self {
        Self {
            co2_reduction: 0.3,
            energy_savings: 0.2,
            job_creation: 0.15,
            social_impact: 0.15,
            governance_score: 0.2,
        }
    }
}

impl EsgWeights {
    pub fn pairs(&self) -> [(Metric, f64); 5] {
        [
            (Metric::Co2Reduction, self.co2_reduction),
            (Metric::EnergySavings, self.energy_savings),
            (Metric::JobCreation, self.job_creation),
            (Metric::SocialImpact, self.social_impact),
            (Metric::GovernanceScore, self.governance_score),
        ]
    }
}

/// Portfolio optimizer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    #[serde(default = "default_risk_tolerance")]
    pub risk_tolerance: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Capital to distribute, in millions
    #[serde(default = "default_capital_budget")]
    pub capital_budget: Decimal,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            risk_tolerance: default_risk_tolerance(),
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            capital_budget: default_capital_budget(),
        }
    }
}

/// Anomaly detector settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    #[serde(default = "default_isolation_trees")]
    pub isolation_trees: usize,
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
    #[serde(default = "default_contamination")]
    pub contamination: f64,
    #[serde(default = "default_mcd_starts")]
    pub mcd_starts: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Composite risk at or above which a project is flagged
    #[serde(default = "default_flag_threshold")]
    pub flag_threshold: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            isolation_trees: default_isolation_trees(),
            max_samples: default_max_samples(),
            contamination: default_contamination(),
            mcd_starts: default_mcd_starts(),
            seed: default_seed(),
            flag_threshold: default_flag_threshold(),
        }
    }
}

/// Sample data generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_sample_projects")]
    pub sample_projects: usize,
    #[serde(default)]
    pub sample_seed: Option<u64>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            sample_projects: default_sample_projects(),
            sample_seed: None,
        }
    }
}

fn default_forest_trees() -> usize {
    100
}

fn default_boosting_stages() -> usize {
    100
}

fn default_learning_rate() -> f64 {
    0.1
}

fn default_boosting_depth() -> usize {
    3
}

fn default_hidden_layers() -> Vec<usize> {
    vec![100, 50]
}

fn default_epochs() -> usize {
    200
}

fn default_nn_learning_rate() -> f64 {
    0.001
}

fn default_l2_penalty() -> f64 {
    1e-4
}

fn default_seed() -> u64 {
    42
}

fn default_risk_tolerance() -> f64 {
    0.5
}

fn default_max_iterations() -> usize {
    100
}

fn default_tolerance() -> f64 {
    1e-6
}

fn default_capital_budget() -> Decimal {
    dec!(100)
}

fn default_isolation_trees() -> usize {
    100
}

fn default_max_samples() -> usize {
    256
}

fn default_contamination() -> f64 {
    0.1
}

fn default_mcd_starts() -> usize {
    30
}

fn default_flag_threshold() -> f64 {
    0.5
}

fn default_sample_projects() -> usize {
    10
}
