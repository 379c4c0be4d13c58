use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Input is missing required column: {0}")]
    MissingColumn(String),

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("No positive revenue observed between {start} and {end}")]
    EmptySeries { start: NaiveDate, end: NaiveDate },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid model parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Insufficient data: {required} observations required, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Model has not been fitted")]
    NotFitted,

    #[error("Numerical error: {0}")]
    NumericalError(String),

    #[error("All forecasting models failed; last error: {0}")]
    Forecast(String),

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
