//! Tests for configuration

#[cfg(test)]
mod tests {
    use super::super::config::*;
    use crate::types::Metric;
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[test]
    fn test_scoring_config_default() {
        let config = ScoringConfig::default();
        assert_eq!(config.forest_trees, 100);
        assert_eq!(config.boosting_stages, 100);
        assert_eq!(config.learning_rate, 0.1);
        assert_eq!(config.boosting_depth, 3);
        assert_eq!(config.hidden_layers, vec![100, 50]);
        assert_eq!(config.epochs, 200);
        assert_eq!(config.model_seed, 42);
        assert!(config.label_seed.is_none());
    }

    #[test]
    fn test_optimizer_config_default() {
        let config = OptimizerConfig::default();
        assert_eq!(config.risk_tolerance, 0.5);
        assert_eq!(config.max_iterations, 100);
        assert_eq!(config.tolerance, 1e-6);
        assert_eq!(config.capital_budget, dec!(100));
    }

    #[test]
    fn test_risk_config_defaults_from_empty_toml() {
        let config: RiskConfig = toml::from_str("").unwrap();
        assert_eq!(config.isolation_trees, 100);
        assert_eq!(config.max_samples, 256);
        assert_eq!(config.contamination, 0.1);
        assert_eq!(config.seed, 42);
    }

    #[test]
    fn test_esg_weights_sum_to_one() {
        let weights = EsgWeights::default();
        let total: f64 = weights.pairs().iter().map(|(_, w)| w).sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert_eq!(weights.pairs()[0], (Metric::Co2Reduction, 0.3));
    }

    #[test]
    fn test_partial_sections() {
        let toml_str = r#"
[scoring]
forest_trees = 25
label_seed = 7

[scoring.weights]
co2_reduction = 0.5

[optimizer]
risk_tolerance = 0.3
capital_budget = 250
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.scoring.forest_trees, 25);
        assert_eq!(config.scoring.boosting_stages, 100);
        assert_eq!(config.scoring.label_seed, Some(7));
        assert_eq!(config.scoring.weights.co2_reduction, 0.5);
        assert_eq!(config.scoring.weights.energy_savings, 0.2);
        assert_eq!(config.optimizer.risk_tolerance, 0.3);
        assert_eq!(config.optimizer.capital_budget, dec!(250));
        assert_eq!(config.risk.mcd_starts, 30);
        assert_eq!(config.data.sample_projects, 10);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[risk]\nisolation_trees = 12\n\n[data]\nsample_seed = 99").unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.risk.isolation_trees, 12);
        assert_eq!(config.data.sample_seed, Some(99));
        assert_eq!(config.scoring.forest_trees, 100);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = Config::load("/nonexistent/esg/config.toml").unwrap();
        assert_eq!(config.optimizer.max_iterations, 100);
    }
}
