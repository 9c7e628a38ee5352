//! Ошибки пайплайнов

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Data quality error: {0}")]
    DataQuality(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Failed to load parameters: {0}")]
    ParameterLoad(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<polars::error::PolarsError> for PipelineError {
    fn from(err: polars::error::PolarsError) -> Self {
        PipelineError::Export(err.to_string())
    }
}

impl PipelineError {
    pub(crate) fn shape(expected: impl ToString, actual: impl ToString) -> Self {
        PipelineError::ShapeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}
