/// Модуль предобработки данных

pub mod clipping;
pub mod feature_engineering;
pub mod imputation;
pub mod normalization;
pub mod statistics;
pub mod summary;

pub use clipping::clip_and_round;
pub use feature_engineering::{FeatureEngineer, QuartileEdges};
pub use imputation::{drop_duplicate_rows, repair_missing_values, RepairReport};
pub use normalization::PixelNormalizer;
pub use summary::{validate_cleaned, TableSummary};
