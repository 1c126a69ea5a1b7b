//! Ошибки пайплайна

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Column '{0}' not found")]
    MissingColumn(String),

    #[error("Column '{column}' is not numeric (row {row}: '{value}')")]
    NonNumericColumn {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Column '{column}' has a missing value at row {row}")]
    MissingValue { column: String, row: usize },

    #[error("Invalid label '{value}' at row {row}, expected 0 or 1")]
    InvalidLabel { row: usize, value: String },

    #[error("Column '{column}' has {found} values, table has {expected} rows")]
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("Empty dataset")]
    EmptyDataset,

    #[error("No numeric feature columns found")]
    NoFeatures,

    #[error("Split error: {0}")]
    Split(String),

    #[error("Model expects {expected} features, got {found}")]
    FeatureMismatch { expected: usize, found: usize },

    #[error("Training error: {0}")]
    Training(String),

    #[error("Chart error: {0}")]
    Chart(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
