//! Session-level tests for the evaluator

use super::*;
use crate::config::{Config, ScoringConfig};
use crate::data::SampleGenerator;
use crate::error::ValidationError;
use crate::ml::{FixedLabelProvider, UniformLabelProvider};
use crate::portfolio::SolverStatus;
use crate::types::ProjectRecord;
use rust_decimal_macros::dec;

fn fast_config(label_seed: Option<u64>) -> Config {
    Config {
        scoring: ScoringConfig {
            forest_trees: 10,
            boosting_stages: 10,
            hidden_layers: vec![8],
            epochs: 20,
            label_seed,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn record(name: &str, co2: f64, energy: f64, jobs: u32, social: f64, governance: f64, investment: f64) -> ProjectRecord {
    ProjectRecord {
        name: name.to_string(),
        co2_reduction: co2,
        energy_savings: energy,
        job_creation: jobs,
        social_impact: social,
        governance_score: governance,
        investment,
    }
}

fn portfolio() -> Dataset {
    Dataset::new(vec![
        record("Solar Farm", 850.0, 42.0, 60, 8.0, 9.1, 7.5),
        record("Wind Retrofit", 210.0, 12.0, 15, 3.0, 6.2, 2.0),
        record("Green Bonds", 540.0, 33.0, 40, 6.5, 7.7, 4.4),
        record("Mass Transit", 120.0, 48.0, 95, 9.5, 5.4, 9.0),
        record("Biogas Plant", 990.0, 18.0, 22, 2.0, 8.8, 1.2),
        record("LED Program", 330.0, 27.0, 12, 4.0, 9.9, 3.1),
    ])
}

#[test]
fn test_operations_before_ingest_are_state_errors() {
    let evaluator = Evaluator::new(&fast_config(Some(1)));

    assert!(!evaluator.has_data());
    assert!(matches!(evaluator.score(), Err(EvalError::State(_))));
    assert!(matches!(evaluator.optimize(0.5), Err(EvalError::State(_))));
    assert!(matches!(evaluator.analyze_risk(), Err(EvalError::State(_))));
    assert!(matches!(evaluator.current_dataset(), Err(EvalError::State(_))));
    assert!(matches!(evaluator.evaluate_all(0.5), Err(EvalError::State(_))));
}

#[test]
fn test_empty_ingest_then_score_is_validation_error() {
    let mut evaluator = Evaluator::new(&fast_config(Some(1)));
    evaluator.ingest(Dataset::empty()).unwrap();

    assert!(evaluator.has_data());
    let err = evaluator.score().unwrap_err();
    assert!(err.is_validation());
    assert!(evaluator.optimize(0.5).unwrap_err().is_validation());
    assert!(evaluator.analyze_risk().unwrap_err().is_validation());
}

#[test]
fn test_invalid_ingest_keeps_previous_dataset() {
    let mut evaluator = Evaluator::new(&fast_config(Some(1)));
    evaluator.ingest(portfolio()).unwrap();

    let mut bad = portfolio().projects().to_vec();
    bad[2].co2_reduction = f64::NAN;
    let err = evaluator.ingest(Dataset::new(bad)).unwrap_err();
    assert!(matches!(err, EvalError::Validation(ValidationError::NonFinite { .. })));

    assert_eq!(evaluator.current_dataset().unwrap(), &portfolio());
}

#[test]
fn test_duplicate_names_rejected() {
    let mut evaluator = Evaluator::with_defaults();
    let data = Dataset::new(vec![
        record("Same", 100.0, 10.0, 10, 1.0, 5.0, 1.0),
        record("Same", 200.0, 20.0, 20, 2.0, 6.0, 2.0),
    ]);
    let err = evaluator.ingest(data).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Validation error: Duplicate project name: Same"
    );
}

#[test]
fn test_score_is_row_aligned() {
    let mut evaluator = Evaluator::new(&fast_config(Some(3)));
    evaluator.ingest(portfolio()).unwrap();

    let result = evaluator.score().unwrap();
    assert_eq!(result.scores.len(), 6);
    assert_eq!(result.projects, portfolio().names());
    assert!(result.scores.iter().all(|s| s.is_finite()));
}

#[test]
fn test_seeded_scoring_repeats() {
    let mut evaluator = Evaluator::new(&fast_config(Some(9)));
    evaluator.ingest(portfolio()).unwrap();

    assert_eq!(evaluator.score().unwrap().scores, evaluator.score().unwrap().scores);
}

#[test]
fn test_default_scoring_varies_between_calls() {
    let mut evaluator = Evaluator::new(&fast_config(None));
    evaluator.ingest(portfolio()).unwrap();

    assert_ne!(evaluator.score().unwrap().scores, evaluator.score().unwrap().scores);
}

#[test]
fn test_label_provider_can_be_swapped() {
    let mut evaluator = Evaluator::new(&fast_config(None))
        .with_label_provider(Box::new(UniformLabelProvider::seeded(4)));
    evaluator.ingest(portfolio()).unwrap();
    assert_eq!(evaluator.score().unwrap().label_source, "uniform_seeded");

    evaluator.set_label_provider(Box::new(FixedLabelProvider::new(vec![0.5; 6])));
    let result = evaluator.score().unwrap();
    assert_eq!(result.label_source, "fixed");
}

#[test]
fn test_optimize_weights_sum_to_one() {
    let mut evaluator = Evaluator::with_defaults();
    evaluator.ingest(portfolio()).unwrap();

    let result = evaluator.optimize(0.5).unwrap();
    assert!(result.converged);
    assert_eq!(result.weights.len(), 6);
    assert!((result.weights.iter().sum::<f64>() - 1.0).abs() < 1e-4);
    assert!(result.weights.iter().all(|w| (-1e-9..=1.0 + 1e-9).contains(w)));
}

#[test]
fn test_sample_portfolio_converges_at_full_tolerance() {
    let mut evaluator = Evaluator::with_defaults();
    evaluator.ingest(SampleGenerator::seeded(25).generate(3)).unwrap();

    let result = evaluator.optimize(1.0).unwrap();
    assert!(result.converged, "{:?} after {} iterations", result.status, result.iterations);
    assert_eq!(result.status, SolverStatus::Converged);
    assert!(result.iterations < 100);
    assert!((result.weights.iter().sum::<f64>() - 1.0).abs() < 1e-4);
}

#[test]
fn test_tiny_tolerance_returns_unconverged_iterate() {
    // Uniform investment and governance put every risk proxy at 1
    let data = Dataset::new(vec![
        record("A", 850.0, 42.0, 60, 8.0, 8.0, 5.0),
        record("B", 210.0, 12.0, 15, 3.0, 8.0, 5.0),
        record("C", 540.0, 33.0, 40, 6.5, 8.0, 5.0),
    ]);
    let mut evaluator = Evaluator::with_defaults();
    evaluator.ingest(data).unwrap();

    let result = evaluator.optimize(0.001).unwrap();
    assert!(!result.converged);
    assert_eq!(result.status, SolverStatus::Infeasible);
    assert_eq!(result.weights.len(), 3);
}

#[test]
fn test_risk_example_environmental_ordering() {
    let data = Dataset::new(vec![
        record("Project 1", 100.0, 10.0, 10, 1.0, 5.0, 1.0),
        record("Project 2", 500.0, 30.0, 50, 5.0, 7.0, 5.0),
        record("Project 3", 1000.0, 50.0, 90, 10.0, 10.0, 10.0),
    ]);
    let mut evaluator = Evaluator::with_defaults();
    evaluator.ingest(data).unwrap();

    let report = evaluator.analyze_risk().unwrap();
    assert_eq!(report.composite.len(), 3);
    assert!(report.environmental[0] > report.environmental[2]);
}

#[test]
fn test_proxies_match_optimizer() {
    let mut evaluator = Evaluator::with_defaults();
    evaluator.ingest(portfolio()).unwrap();

    let returns = evaluator.expected_returns().unwrap();
    let risks = evaluator.risks().unwrap();
    let result = evaluator.optimize(0.8).unwrap();

    let expected: f64 = result.weights.iter().zip(&returns).map(|(w, r)| w * r).sum();
    let risk: f64 = result.weights.iter().zip(&risks).map(|(w, r)| w * r).sum();
    assert!((result.expected_return - expected).abs() < 1e-12);
    assert!((result.portfolio_risk - risk).abs() < 1e-12);
}

#[test]
fn test_weighted_scores_follow_metrics() {
    let mut evaluator = Evaluator::with_defaults();
    evaluator.ingest(portfolio()).unwrap();

    let scores = evaluator.weighted_scores().unwrap();
    assert_eq!(scores.len(), 6);
    // Weights sum to 1 and every normalized metric is in [0, 1]
    assert!(scores.iter().all(|s| (0.0..=1.0 + 1e-12).contains(s)));
}

#[test]
fn test_evaluate_all_joins_rows() {
    let mut evaluator = Evaluator::new(&fast_config(Some(2)));
    evaluator.ingest(portfolio()).unwrap();

    let report = evaluator.evaluate_all(0.5).unwrap();
    assert_eq!(report.rows.len(), 6);
    assert_eq!(report.rows[0].project, "Solar Farm");
    assert_eq!(report.summary.project_count, 6);
    assert_eq!(report.capital_budget, dec!(100));

    let allocated: Decimal = report.rows.iter().map(|r| r.allocation).sum();
    assert_eq!(allocated, dec!(100));
}

#[test]
fn test_handle_shares_one_session() {
    let handle = EvaluatorHandle::new(Evaluator::new(&fast_config(Some(6))));
    assert!(!handle.has_data());

    let writer = handle.clone();
    std::thread::spawn(move || writer.ingest(portfolio()))
        .join()
        .unwrap()
        .unwrap();

    assert!(handle.has_data());
    assert_eq!(handle.current_dataset().unwrap().len(), 6);

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let h = handle.clone();
            std::thread::spawn(move || h.score().map(|r| r.scores))
        })
        .collect();
    let results: Vec<Vec<f64>> = readers.into_iter().map(|t| t.join().unwrap().unwrap()).collect();
    assert!(results.windows(2).all(|w| w[0] == w[1]));
}
