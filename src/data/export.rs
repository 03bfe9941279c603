//! JSON export of evaluation results

use crate::error::Result;
use crate::evaluator::EvaluationReport;
use std::fs::File;
use std::io::{BufWriter, Write};

/// Pretty-printed JSON for a report
pub fn report_to_json(report: &EvaluationReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

pub fn write_report_json<W: Write>(report: &EvaluationReport, writer: W) -> Result<()> {
    let mut writer = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.flush()?;
    Ok(())
}

/// Write a report to `path`; `~` is expanded
pub fn save_report_json(report: &EvaluationReport, path: &str) -> Result<()> {
    let expanded = shellexpand::tilde(path).into_owned();
    write_report_json(report, File::create(&expanded)?)?;
    tracing::info!(path = %expanded, report_id = %report.id, "report exported");
    Ok(())
}

pub fn report_from_json(text: &str) -> Result<EvaluationReport> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SampleGenerator;
    use crate::evaluator::Evaluator;
    use tempfile::tempdir;

    fn report() -> EvaluationReport {
        let mut evaluator = Evaluator::with_defaults();
        evaluator.ingest(SampleGenerator::seeded(3).generate(8)).unwrap();
        evaluator.evaluate_all(0.5).unwrap()
    }

    #[test]
    fn test_json_contains_rows_and_id() {
        let report = report();
        let json = report_to_json(&report).unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["rows"].as_array().unwrap().len(), 8);
        assert_eq!(value["id"], report.id.to_string());
        assert_eq!(value["rows"][0]["project"], "Project 1");
    }

    #[test]
    fn test_saved_report_reloads() {
        let report = report();
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.json");

        save_report_json(&report, path.to_str().unwrap()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let loaded = report_from_json(&text).unwrap();

        assert_eq!(loaded.id, report.id);
        assert_eq!(loaded.generated_at, report.generated_at);
        assert_eq!(loaded.rows.len(), report.rows.len());
        assert_eq!(loaded.capital_budget, report.capital_budget);
    }

    #[test]
    fn test_malformed_json_is_json_error() {
        let err = report_from_json("{\"rows\": 3}").unwrap_err();
        assert!(matches!(err, crate::error::EvalError::Json(_)));
    }
}
