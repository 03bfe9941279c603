//! Error types for the evaluation engine

use thiserror::Error;

/// Input validation failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Column '{column}' has non-numeric value '{value}' at row {row}")]
    NonNumeric { column: String, row: usize, value: String },

    #[error("Column '{column}' has non-finite value at row {row}")]
    NonFinite { column: String, row: usize },

    #[error("Column '{column}' must not be negative (row {row})")]
    Negative { column: String, row: usize },

    #[error("Duplicate project name: {0}")]
    DuplicateName(String),

    #[error("Insufficient data: need at least {required} projects, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Risk tolerance must be in (0, 1], got {0}")]
    InvalidRiskTolerance(f64),

    #[error("Row {row} has {actual} fields, expected {expected}")]
    RowLength { row: usize, expected: usize, actual: usize },
}

/// Top-level error for every core operation
#[derive(Error, Debug)]
pub enum EvalError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Training failed for {model} on {rows}x{cols} input: {reason}")]
    Training {
        model: String,
        rows: usize,
        cols: usize,
        reason: String,
    },

    #[error("Computation failed in {component} on {rows}x{cols} input: {reason}")]
    Computation {
        component: String,
        rows: usize,
        cols: usize,
        reason: String,
    },

    #[error("State error: {0}")]
    State(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
}

impl EvalError {
    pub fn training(model: &str, shape: (usize, usize), reason: impl Into<String>) -> Self {
        EvalError::Training {
            model: model.to_string(),
            rows: shape.0,
            cols: shape.1,
            reason: reason.into(),
        }
    }

    pub fn computation(component: &str, shape: (usize, usize), reason: impl Into<String>) -> Self {
        EvalError::Computation {
            component: component.to_string(),
            rows: shape.0,
            cols: shape.1,
            reason: reason.into(),
        }
    }

    /// Whether the error was caused by bad input rather than a failing model
    pub fn is_validation(&self) -> bool {
        matches!(self, EvalError::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, EvalError>;
