/// Классификатор цифр и все, что нужно для его обучения

pub mod checkpoint;
pub mod classifier;
pub mod evaluation;
pub mod optimizer;
pub mod training;

pub use checkpoint::{load_parameters, save_parameters};
pub use classifier::{DenseClassifier, Topology};
pub use evaluation::{evaluate_model, predict_sample, EvaluationReport};
pub use optimizer::Adam;
pub use training::{EpochMetrics, Trainer, TrainingHistory, TrainingPhase};
