//! CSV import and export
//!
//! Input files carry a header row with at least the project name and the six
//! metric columns; extra columns are ignored. A UTF-8 BOM is tolerated.

use crate::error::Result;
use crate::evaluator::EvaluationReport;
use crate::types::{Dataset, Metric, NAME_COLUMN};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Parse a dataset from CSV text
pub fn read_csv<R: Read>(mut reader: R) -> Result<Dataset> {
    let mut content = Vec::new();
    reader.read_to_end(&mut content)?;
    let body = content.strip_prefix(UTF8_BOM).unwrap_or(&content);

    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(body);

    let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        // Blank lines inside the file
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    let dataset = Dataset::from_table(&headers, &rows)?;
    tracing::debug!(columns = headers.len(), projects = dataset.len(), "csv parsed");
    Ok(dataset)
}

/// Load a dataset from a CSV file; `~` is expanded
pub fn load_csv(path: &str) -> Result<Dataset> {
    let expanded = shellexpand::tilde(path).into_owned();
    let file = File::open(Path::new(&expanded))?;
    let dataset = read_csv(file)?;
    tracing::info!(path = %expanded, projects = dataset.len(), "dataset loaded");
    Ok(dataset)
}

/// Write a dataset with the standard column headers
pub fn write_dataset_csv<W: Write>(dataset: &Dataset, writer: W) -> Result<()> {
    let mut csv_writer = WriterBuilder::new().from_writer(writer);
    for project in dataset.iter() {
        csv_writer.serialize(project)?;
    }
    // A header row even when there is nothing to write
    if dataset.is_empty() {
        csv_writer.write_record(header_row())?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write one line per project of an evaluation report
pub fn write_report_csv<W: Write>(report: &EvaluationReport, writer: W) -> Result<()> {
    let mut csv_writer = WriterBuilder::new().from_writer(writer);
    csv_writer.write_record([
        "Project Name",
        "Score",
        "Weighted Score",
        "Weight",
        "Allocation (M)",
        "Composite Risk",
        "Environmental Risk",
        "Financial Risk",
    ])?;

    for row in &report.rows {
        csv_writer.write_record([
            row.project.clone(),
            format!("{:.6}", row.score),
            format!("{:.4}", row.weighted_score),
            format!("{:.6}", row.weight),
            row.allocation.to_string(),
            format!("{:.4}", row.composite_risk),
            format!("{:.4}", row.environmental_risk),
            format!("{:.4}", row.financial_risk),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

fn header_row() -> Vec<&'static str> {
    let mut headers = vec![NAME_COLUMN];
    headers.extend(Metric::ALL.iter().map(|m| m.header()));
    headers
}
