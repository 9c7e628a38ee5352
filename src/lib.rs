//! ML pipelines - очистка табличных данных и обучение классификатора цифр

pub mod config;
pub mod datasets;
pub mod error;
pub mod export;
pub mod models;
pub mod pipeline;
pub mod preprocessing;
pub mod types;

pub use error::{PipelineError, Result};
pub use types::*;

// Re-export для удобства
pub use config::{CleaningConfig, PipelineConfig, TrainingConfig};
pub use pipeline::{run_cleaning_pipeline, run_training_pipeline, DigitSource};
