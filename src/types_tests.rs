//! Tests for core types

#[cfg(test)]
mod tests {
    use super::super::types::*;
    use crate::error::{EvalError, ValidationError};
    use rust_decimal_macros::dec;

    fn headers() -> Vec<String> {
        [
            "Project Name",
            "CO2 Reduction",
            "Energy Savings",
            "Job Creation",
            "Social Impact",
            "Governance Score",
            "Investment (M)",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn create_test_project(name: &str, investment: f64, jobs: u32) -> ProjectRecord {
        ProjectRecord {
            name: name.to_string(),
            co2_reduction: 400.0,
            energy_savings: 25.0,
            job_creation: jobs,
            social_impact: 6.0,
            governance_score: 7.5,
            investment,
        }
    }

    #[test]
    fn test_record_serializes_with_column_headers() {
        let json = serde_json::to_string(&create_test_project("Solar", 2.5, 40)).unwrap();
        assert!(json.contains("\"Project Name\":\"Solar\""));
        assert!(json.contains("\"Investment (M)\":2.5"));
        assert!(json.contains("\"Job Creation\":40"));
    }

    #[test]
    fn test_metric_headers_and_values() {
        let project = create_test_project("Solar", 2.5, 40);
        assert_eq!(Metric::ALL.len(), 6);
        assert_eq!(Metric::JobCreation.header(), "Job Creation");
        assert_eq!(Metric::JobCreation.value(&project), 40.0);
        assert_eq!(Metric::Investment.value(&project), 2.5);
    }

    #[test]
    fn test_from_table_any_column_order() {
        let mut h = headers();
        h.swap(0, 6);
        let rows = vec![row(&["3.5", "100", "10", "20", "4", "6", "Wind"])];

        let data = Dataset::from_table(&h, &rows).unwrap();
        assert_eq!(data.projects()[0].name, "Wind");
        assert_eq!(data.projects()[0].investment, 3.5);
    }

    #[test]
    fn test_from_table_rejects_fractional_jobs() {
        let rows = vec![row(&["A", "100", "10", "2.5", "4", "6", "1"])];
        let err = Dataset::from_table(&headers(), &rows).unwrap_err();
        assert!(matches!(
            err,
            EvalError::Validation(ValidationError::NonNumeric { ref column, .. }) if column == "Job Creation"
        ));
    }

    #[test]
    fn test_from_table_rejects_negative_quantity() {
        let rows = vec![row(&["A", "-5", "10", "2", "4", "6", "1"])];
        let err = Dataset::from_table(&headers(), &rows).unwrap_err();
        assert!(matches!(err, EvalError::Validation(ValidationError::Negative { row: 0, .. })));
    }

    #[test]
    fn test_from_table_rejects_short_row() {
        let rows = vec![row(&["A", "100", "10"])];
        let err = Dataset::from_table(&headers(), &rows).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: Row 0 has 3 fields, expected 7"
        );
    }

    #[test]
    fn test_validate_accepts_empty() {
        assert!(Dataset::empty().validate().is_ok());
    }

    #[test]
    fn test_require_len() {
        let data = Dataset::new(vec![create_test_project("A", 1.0, 10)]);
        assert!(data.require_len(1).is_ok());
        let err = data.require_len(2).unwrap_err();
        assert!(matches!(
            err,
            EvalError::Validation(ValidationError::InsufficientData { required: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_summary() {
        let data = Dataset::new(vec![
            create_test_project("A", 1.25, 10),
            create_test_project("B", 3.5, 30),
        ]);
        let summary = data.summary();
        assert_eq!(summary.project_count, 2);
        assert_eq!(summary.total_investment_m, dec!(4.75));
        assert_eq!(summary.total_jobs, 40);
        assert_eq!(summary.mean_co2_reduction, 400.0);
    }

    #[test]
    fn test_empty_summary_has_zero_means() {
        let summary = Dataset::empty().summary();
        assert_eq!(summary.project_count, 0);
        assert_eq!(summary.mean_governance_score, 0.0);
        assert_eq!(summary.total_investment_m, dec!(0));
    }
}
