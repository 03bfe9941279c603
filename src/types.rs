//! Core data types: project records and the dataset they form

use crate::error::{Result, ValidationError};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Header of the project name column
pub const NAME_COLUMN: &str = "Project Name";

/// One candidate project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    #[serde(rename = "Project Name")]
    pub name: String,
    /// Tonnes of CO2 avoided
    #[serde(rename = "CO2 Reduction")]
    pub co2_reduction: f64,
    /// Energy saved (MWh)
    #[serde(rename = "Energy Savings")]
    pub energy_savings: f64,
    #[serde(rename = "Job Creation")]
    pub job_creation: u32,
    /// 1-10
    #[serde(rename = "Social Impact")]
    pub social_impact: f64,
    /// 5-10
    #[serde(rename = "Governance Score")]
    pub governance_score: f64,
    /// Investment size in millions
    #[serde(rename = "Investment (M)")]
    pub investment: f64,
}

/// Numeric project metric, addressable by column header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    Co2Reduction,
    EnergySavings,
    JobCreation,
    SocialImpact,
    GovernanceScore,
    Investment,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::Co2Reduction,
        Metric::EnergySavings,
        Metric::JobCreation,
        Metric::SocialImpact,
        Metric::GovernanceScore,
        Metric::Investment,
    ];

    /// Column header used in tabular sources
    pub fn header(&self) -> &'static str {
        match self {
            Metric::Co2Reduction => "CO2 Reduction",
            Metric::EnergySavings => "Energy Savings",
            Metric::JobCreation => "Job Creation",
            Metric::SocialImpact => "Social Impact",
            Metric::GovernanceScore => "Governance Score",
            Metric::Investment => "Investment (M)",
        }
    }

    pub fn value(&self, project: &ProjectRecord) -> f64 {
        match self {
            Metric::Co2Reduction => project.co2_reduction,
            Metric::EnergySavings => project.energy_savings,
            Metric::JobCreation => f64::from(project.job_creation),
            Metric::SocialImpact => project.social_impact,
            Metric::GovernanceScore => project.governance_score,
            Metric::Investment => project.investment,
        }
    }

    /// Metrics that may never be negative
    fn non_negative(&self) -> bool {
        matches!(
            self,
            Metric::Co2Reduction | Metric::EnergySavings | Metric::JobCreation | Metric::Investment
        )
    }
}

/// Ordered collection of projects.
///
/// Row order is the identity key: every derived vector (scores, weights,
/// risks) is aligned to it by position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    projects: Vec<ProjectRecord>,
}

impl Dataset {
    pub fn new(projects: Vec<ProjectRecord>) -> Self {
        Self { projects }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a dataset from an untyped table, checking that every required
    /// column is present and numeric.
    pub fn from_table(headers: &[String], rows: &[Vec<String>]) -> Result<Self> {
        let position = |column: &str| -> std::result::Result<usize, ValidationError> {
            headers
                .iter()
                .position(|h| h.trim() == column)
                .ok_or_else(|| ValidationError::MissingColumn(column.to_string()))
        };

        let name_idx = position(NAME_COLUMN)?;
        let mut metric_idx = Vec::with_capacity(Metric::ALL.len());
        for metric in Metric::ALL {
            metric_idx.push((metric, position(metric.header())?));
        }

        let mut projects = Vec::with_capacity(rows.len());
        for (row_no, row) in rows.iter().enumerate() {
            if row.len() != headers.len() {
                return Err(ValidationError::RowLength {
                    row: row_no,
                    expected: headers.len(),
                    actual: row.len(),
                }
                .into());
            }

            let mut values = [0.0f64; 6];
            for (slot, (metric, idx)) in values.iter_mut().zip(&metric_idx) {
                *slot = parse_numeric(metric, row_no, &row[*idx])?;
            }

            let jobs = values[2];
            if jobs.fract() != 0.0 || jobs > f64::from(u32::MAX) {
                return Err(ValidationError::NonNumeric {
                    column: Metric::JobCreation.header().to_string(),
                    row: row_no,
                    value: row[metric_idx[2].1].clone(),
                }
                .into());
            }

            projects.push(ProjectRecord {
                name: row[name_idx].trim().to_string(),
                co2_reduction: values[0],
                energy_savings: values[1],
                job_creation: jobs as u32,
                social_impact: values[3],
                governance_score: values[4],
                investment: values[5],
            });
        }

        Ok(Self { projects })
    }

    /// Check the invariants `ingest` relies on: finite metrics, no negative
    /// quantities, unique names.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.projects.len());
        for (row, project) in self.projects.iter().enumerate() {
            for metric in Metric::ALL {
                let value = metric.value(project);
                if !value.is_finite() {
                    return Err(ValidationError::NonFinite {
                        column: metric.header().to_string(),
                        row,
                    }
                    .into());
                }
                if metric.non_negative() && value < 0.0 {
                    return Err(ValidationError::Negative {
                        column: metric.header().to_string(),
                        row,
                    }
                    .into());
                }
            }
            if !seen.insert(project.name.as_str()) {
                return Err(ValidationError::DuplicateName(project.name.clone()).into());
            }
        }
        Ok(())
    }

    /// Fail unless the dataset has at least `required` projects
    pub fn require_len(&self, required: usize) -> Result<()> {
        if self.projects.len() < required {
            return Err(ValidationError::InsufficientData {
                required,
                actual: self.projects.len(),
            }
            .into());
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn projects(&self) -> &[ProjectRecord] {
        &self.projects
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProjectRecord> {
        self.projects.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.projects.iter().map(|p| p.name.clone()).collect()
    }

    /// Raw values of one metric, in row order
    pub fn column(&self, metric: Metric) -> Vec<f64> {
        self.projects.iter().map(|p| metric.value(p)).collect()
    }

    pub fn summary(&self) -> DatasetSummary {
        let n = self.projects.len();
        let mean = |metric: Metric| {
            if n == 0 {
                0.0
            } else {
                self.column(metric).iter().sum::<f64>() / n as f64
            }
        };

        let total_investment: f64 = self.column(Metric::Investment).iter().sum();

        DatasetSummary {
            project_count: n,
            total_investment_m: Decimal::from_f64(total_investment)
                .unwrap_or(Decimal::ZERO)
                .round_dp(2),
            total_jobs: self.projects.iter().map(|p| u64::from(p.job_creation)).sum(),
            mean_co2_reduction: mean(Metric::Co2Reduction),
            mean_energy_savings: mean(Metric::EnergySavings),
            mean_social_impact: mean(Metric::SocialImpact),
            mean_governance_score: mean(Metric::GovernanceScore),
        }
    }
}

impl From<Vec<ProjectRecord>> for Dataset {
    fn from(projects: Vec<ProjectRecord>) -> Self {
        Self::new(projects)
    }
}

fn parse_numeric(metric: &Metric, row: usize, raw: &str) -> Result<f64> {
    let value: f64 = raw.trim().parse().map_err(|_| ValidationError::NonNumeric {
        column: metric.header().to_string(),
        row,
        value: raw.to_string(),
    })?;
    if !value.is_finite() {
        return Err(ValidationError::NonFinite {
            column: metric.header().to_string(),
            row,
        }
        .into());
    }
    if metric.non_negative() && value < 0.0 {
        return Err(ValidationError::Negative {
            column: metric.header().to_string(),
            row,
        }
        .into());
    }
    Ok(value)
}

/// Headline statistics for a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub project_count: usize,
    pub total_investment_m: Decimal,
    pub total_jobs: u64,
    pub mean_co2_reduction: f64,
    pub mean_energy_savings: f64,
    pub mean_social_impact: f64,
    pub mean_governance_score: f64,
}
