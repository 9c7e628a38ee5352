//! Цикл обучения
//!
//! Uninitialized → Training(1) → Validating(1) → Training(2) → … → Done.
//! Ранней остановки и промежуточных чекпоинтов нет: ошибка посреди эпохи
//! прерывает обучение целиком.

use std::fmt;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::config::TrainingConfig;
use crate::datasets::DigitDataset;
use crate::error::{PipelineError, Result};
use crate::models::classifier::{softmax_cross_entropy, DenseClassifier};
use crate::models::optimizer::Adam;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingPhase {
    Uninitialized,
    Training { epoch: usize },
    Validating { epoch: usize },
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub epochs: usize,
    pub train_loss: f64,
    pub val_loss: f64,
}

impl fmt::Display for EpochMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Epoch {}/{}, Train Loss: {:.4}, Val Loss: {:.4}",
            self.epoch, self.epochs, self.train_loss, self.val_loss
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochMetrics>,
}

impl TrainingHistory {
    pub fn train_losses(&self) -> Vec<f64> {
        self.epochs.iter().map(|e| e.train_loss).collect()
    }

    pub fn val_losses(&self) -> Vec<f64> {
        self.epochs.iter().map(|e| e.val_loss).collect()
    }
}

pub struct Trainer {
    config: TrainingConfig,
    phase: TrainingPhase,
    optimizer: Adam,
    rng: StdRng,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            optimizer: Adam::from_config(&config),
            rng: StdRng::seed_from_u64(config.seed),
            phase: TrainingPhase::Uninitialized,
            config,
        })
    }

    pub fn phase(&self) -> TrainingPhase {
        self.phase
    }

    /// Полное обучение. `on_epoch` вызывается после валидации каждой эпохи.
    pub fn fit<F>(
        &mut self,
        model: &mut DenseClassifier,
        train: &DigitDataset,
        validation: &DigitDataset,
        mut on_epoch: F,
    ) -> Result<TrainingHistory>
    where
        F: FnMut(&EpochMetrics),
    {
        if self.phase != TrainingPhase::Uninitialized {
            return Err(PipelineError::Config(format!(
                "trainer cannot start from phase {:?}",
                self.phase
            )));
        }
        if train.is_empty() {
            return Err(PipelineError::DataQuality("training split is empty".to_string()));
        }
        if validation.is_empty() {
            return Err(PipelineError::DataQuality("validation split is empty".to_string()));
        }

        tracing::info!(
            "Training {} parameters on {} samples ({} validation) for {} epochs",
            model.num_parameters(),
            train.len(),
            validation.len(),
            self.config.epochs
        );

        let mut history = TrainingHistory::default();
        let mut train_loss = 0.0;
        self.phase = TrainingPhase::Training { epoch: 1 };

        loop {
            match self.phase {
                TrainingPhase::Training { epoch } => {
                    train_loss = self.train_epoch(model, train)?;
                    self.phase = TrainingPhase::Validating { epoch };
                }
                TrainingPhase::Validating { epoch } => {
                    let val_loss = self.validation_loss(model, validation)?;
                    let metrics = EpochMetrics {
                        epoch,
                        epochs: self.config.epochs,
                        train_loss,
                        val_loss,
                    };
                    tracing::debug!("{}", metrics);
                    on_epoch(&metrics);
                    history.epochs.push(metrics);

                    self.phase = if epoch == self.config.epochs {
                        TrainingPhase::Done
                    } else {
                        TrainingPhase::Training { epoch: epoch + 1 }
                    };
                }
                TrainingPhase::Done => break,
                TrainingPhase::Uninitialized => {
                    return Err(PipelineError::Config("trainer lost its phase".to_string()))
                }
            }
        }

        Ok(history)
    }

    /// Средняя по батчам потеря на обучающей выборке, с обновлением параметров
    fn train_epoch(&mut self, model: &mut DenseClassifier, train: &DigitDataset) -> Result<f64> {
        let batches = if self.config.shuffle {
            train.shuffled_batches(self.config.batch_size, &mut self.rng)
        } else {
            train.batches(self.config.batch_size)
        };

        let mut running_loss = 0.0;
        let mut n_batches = 0usize;
        for batch in batches {
            let cache = model.forward_train(&batch.images)?;
            let (loss, gradients) = model.backward(&cache, &batch.labels)?;
            self.optimizer.step(model, &gradients)?;

            running_loss += loss;
            n_batches += 1;
        }

        Ok(running_loss / n_batches as f64)
    }

    /// Средняя по батчам потеря без обновления параметров
    fn validation_loss(&self, model: &DenseClassifier, validation: &DigitDataset) -> Result<f64> {
        let mut running_loss = 0.0;
        let mut n_batches = 0usize;
        for batch in validation.batches(self.config.batch_size) {
            let logits = model.forward(&batch.images)?;
            let (loss, _) = softmax_cross_entropy(&logits, &batch.labels)?;
            running_loss += loss;
            n_batches += 1;
        }

        Ok(running_loss / n_batches as f64)
    }
}
