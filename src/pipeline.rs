//! Сквозные пайплайны: очистка таблицы и обучение классификатора

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{CleaningConfig, TrainingConfig};
use crate::datasets::{generate_customers, DigitDataset};
use crate::error::{PipelineError, Result};
use crate::export::export_csv;
use crate::models::{
    evaluate_model, load_parameters, predict_sample, save_parameters, DenseClassifier,
    EpochMetrics, EvaluationReport, Trainer, TrainingHistory,
};
use crate::preprocessing::{
    clip_and_round, drop_duplicate_rows, repair_missing_values, validate_cleaned,
    FeatureEngineer, PixelNormalizer, QuartileEdges, RepairReport, TableSummary,
};
use crate::types::CustomerTable;

#[derive(Debug, Clone)]
pub struct CleaningOutcome {
    pub table: CustomerTable,
    pub raw_summary: TableSummary,
    pub summary: TableSummary,
    pub repair: RepairReport,
    pub quartiles: QuartileEdges,
    pub duplicates_dropped: usize,
}

/// Последовательность правил очистки над переданной таблицей
pub fn clean_table(mut table: CustomerTable, config: &CleaningConfig) -> Result<CleaningOutcome> {
    let raw_summary = TableSummary::from_table(&table);
    tracing::info!(
        "Cleaning {} records ({} missing values, {} duplicates)",
        raw_summary.total_records,
        raw_summary.missing_values,
        raw_summary.duplicate_records
    );

    // 1. Пропуски и недопустимые значения
    let repair = repair_missing_values(&mut table, &config.placeholders)?;
    tracing::info!(
        "Filled {} values, replaced {} invalid values",
        repair.total_filled(),
        repair.total_invalidated()
    );

    let duplicates_dropped = if config.drop_duplicates {
        drop_duplicate_rows(&mut table)
    } else {
        0
    };

    // 2. Диапазоны и округление
    clip_and_round(&mut table);

    // 3. Производные признаки
    let quartiles = FeatureEngineer::derive_features(&mut table)?;

    validate_cleaned(&table)?;
    let summary = TableSummary::from_table(&table);

    Ok(CleaningOutcome {
        table,
        raw_summary,
        summary,
        repair,
        quartiles,
        duplicates_dropped,
    })
}

/// Генерация данных, очистка и выгрузка в CSV
pub fn run_cleaning_pipeline(config: &CleaningConfig, output: &Path) -> Result<CleaningOutcome> {
    config.validate()?;

    let table = generate_customers(config);
    let outcome = clean_table(table, config)?;
    export_csv(&outcome.table, output)?;

    Ok(outcome)
}

/// Откуда брать изображения для обучения
#[derive(Debug, Clone)]
pub enum DigitSource {
    Idx {
        train_images: PathBuf,
        train_labels: PathBuf,
        test_images: PathBuf,
        test_labels: PathBuf,
    },
    Synthetic {
        train_samples: usize,
        test_samples: usize,
    },
}

pub fn load_digits(source: &DigitSource, config: &TrainingConfig) -> Result<(DigitDataset, DigitDataset)> {
    match source {
        DigitSource::Idx {
            train_images,
            train_labels,
            test_images,
            test_labels,
        } => {
            let normalizer = PixelNormalizer::new(config.pixel_mean, config.pixel_std)?;
            let train = DigitDataset::from_idx_files(train_images, train_labels, &normalizer)?;
            let test = DigitDataset::from_idx_files(test_images, test_labels, &normalizer)?;
            Ok((train, test))
        }
        DigitSource::Synthetic {
            train_samples,
            test_samples,
        } => {
            let all = DigitDataset::synthetic(
                train_samples + test_samples,
                crate::datasets::NUM_CLASSES,
                0.8,
                config.seed,
            )?;
            let ratio = *train_samples as f64 / (train_samples + test_samples).max(1) as f64;
            all.split(ratio)
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: DenseClassifier,
    pub history: TrainingHistory,
    pub evaluation: EvaluationReport,
    /// (истинная метка, предсказание перезагруженной модели) для первого тестового изображения
    pub demo: Option<(usize, usize)>,
}

/// Загрузка данных, обучение, оценка, сохранение и проверочная перезагрузка
pub fn run_training_pipeline<F>(
    config: &TrainingConfig,
    source: &DigitSource,
    checkpoint: &Path,
    on_epoch: F,
) -> Result<TrainingOutcome>
where
    F: FnMut(&EpochMetrics),
{
    let (train, test) = load_digits(source, config)?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut model = DenseClassifier::new(&mut rng);

    let mut trainer = Trainer::new(config.clone())?;
    let history = trainer.fit(&mut model, &train, &test, on_epoch)?;

    let evaluation = evaluate_model(&model, &test, config.batch_size)?;

    save_parameters(&model, checkpoint)?;
    let restored = load_parameters(checkpoint)?;
    if restored != model {
        return Err(PipelineError::ParameterLoad(format!(
            "parameters reloaded from {} differ from the trained model",
            checkpoint.display()
        )));
    }

    let demo = match test.sample(0) {
        Some((image, label)) => Some((label, predict_sample(&restored, image)?)),
        None => None,
    };

    Ok(TrainingOutcome {
        model: restored,
        history,
        evaluation,
        demo,
    })
}
