/// Источники данных для обоих пайплайнов

pub mod customers;
pub mod digits;

pub use customers::generate_customers;
pub use digits::{Batch, DigitDataset, IMAGE_PIXELS, NUM_CLASSES};
