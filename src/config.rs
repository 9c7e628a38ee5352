//! Настройки пайплайнов
//!
//! Все поля имеют значения по умолчанию, поэтому JSON-файл может задавать
//! только то, что нужно переопределить.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub cleaning: CleaningConfig,
    #[serde(default)]
    pub training: TrainingConfig,
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: PipelineConfig = serde_json::from_str(&raw)
            .map_err(|e| PipelineError::Config(format!("invalid {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.cleaning.validate()?;
        self.training.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningConfig {
    #[serde(default = "default_records")]
    pub records: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Доля пропусков, вносимых генератором в каждую nullable колонку
    #[serde(default = "default_missing_rate")]
    pub missing_rate: f64,
    /// Доля заведомо неверных значений (отрицательный возраст/сумма)
    #[serde(default = "default_invalid_rate")]
    pub invalid_rate: f64,
    #[serde(default)]
    pub drop_duplicates: bool,
    #[serde(default)]
    pub placeholders: Placeholders,
}

impl CleaningConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, rate) in [
            ("missing_rate", self.missing_rate),
            ("invalid_rate", self.invalid_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(PipelineError::Config(format!(
                    "{} must be within [0, 1], got {}",
                    name, rate
                )));
            }
        }
        Ok(())
    }
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            records: default_records(),
            seed: default_seed(),
            missing_rate: default_missing_rate(),
            invalid_rate: default_invalid_rate(),
            drop_duplicates: false,
            placeholders: Placeholders::default(),
        }
    }
}

/// Значения-заглушки для текстовых колонок
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placeholders {
    #[serde(default = "default_unknown")]
    pub name: String,
    #[serde(default = "default_email")]
    pub email: String,
    #[serde(default = "default_unknown")]
    pub category: String,
    #[serde(default = "default_unknown")]
    pub phone_number: String,
}

impl Default for Placeholders {
    fn default() -> Self {
        Self {
            name: default_unknown(),
            email: default_email(),
            category: default_unknown(),
            phone_number: default_unknown(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_beta1")]
    pub beta1: f64,
    #[serde(default = "default_beta2")]
    pub beta2: f64,
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_shuffle")]
    pub shuffle: bool,
    /// Нормализация пикселей: (x - mean) / std после приведения к [0, 1]
    #[serde(default = "default_pixel_stat")]
    pub pixel_mean: f64,
    #[serde(default = "default_pixel_stat")]
    pub pixel_std: f64,
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(PipelineError::Config("epochs must be at least 1".to_string()));
        }
        if self.batch_size == 0 {
            return Err(PipelineError::Config("batch_size must be at least 1".to_string()));
        }
        if self.learning_rate <= 0.0 {
            return Err(PipelineError::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(0.0..1.0).contains(&self.beta1) || !(0.0..1.0).contains(&self.beta2) {
            return Err(PipelineError::Config("betas must be within [0, 1)".to_string()));
        }
        if self.pixel_std <= 0.0 {
            return Err(PipelineError::Config("pixel_std must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: default_epochs(),
            batch_size: default_batch_size(),
            learning_rate: default_learning_rate(),
            beta1: default_beta1(),
            beta2: default_beta2(),
            epsilon: default_epsilon(),
            seed: default_seed(),
            shuffle: default_shuffle(),
            pixel_mean: default_pixel_stat(),
            pixel_std: default_pixel_stat(),
        }
    }
}

fn default_records() -> usize { 1000 }
fn default_seed() -> u64 { 42 }
fn default_missing_rate() -> f64 { 0.05 }
fn default_invalid_rate() -> f64 { 0.02 }
fn default_unknown() -> String { "Unknown".to_string() }
fn default_email() -> String { "unknown@example.com".to_string() }
fn default_epochs() -> usize { 5 }
fn default_batch_size() -> usize { 64 }
fn default_learning_rate() -> f64 { 0.001 }
fn default_beta1() -> f64 { 0.9 }
fn default_beta2() -> f64 { 0.999 }
fn default_epsilon() -> f64 { 1e-8 }
fn default_shuffle() -> bool { true }
fn default_pixel_stat() -> f64 { 0.5 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{ "training": { "epochs": 2 } }"#).unwrap();

        assert_eq!(config.training.epochs, 2);
        assert_eq!(config.training.batch_size, 64);
        assert_eq!(config.cleaning.records, 1000);
        assert_eq!(config.cleaning.placeholders.email, "unknown@example.com");
    }

    #[test]
    fn zero_epochs_rejected() {
        let config = TrainingConfig {
            epochs: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = PipelineConfig::from_file(Path::new("/nonexistent/pipelines.json")).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
