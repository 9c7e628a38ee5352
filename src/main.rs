/// CLI для запуска пайплайнов

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber;

use ml_pipelines::{run_cleaning_pipeline, run_training_pipeline, DigitSource, PipelineConfig};

#[derive(Parser, Debug)]
#[command(name = "ml-pipelines", version, about = "Data cleaning and digit classifier training")]
struct Cli {
    /// JSON-файл с настройками (необязательно)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Сгенерировать таблицу покупателей, очистить и выгрузить в CSV
    Clean {
        #[arg(long)]
        records: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(short, long, default_value = "cleaned_customers.csv")]
        output: PathBuf,
        /// Удалять полные дубликаты строк после заполнения пропусков
        #[arg(long)]
        drop_duplicates: bool,
    },
    /// Обучить классификатор цифр и сохранить параметры
    Train {
        #[arg(long, requires_all = ["train_labels", "test_images", "test_labels"])]
        train_images: Option<PathBuf>,
        #[arg(long)]
        train_labels: Option<PathBuf>,
        #[arg(long)]
        test_images: Option<PathBuf>,
        #[arg(long)]
        test_labels: Option<PathBuf>,
        /// Размер синтетической выборки, если IDX-файлы не заданы
        #[arg(long, default_value_t = 2000)]
        synthetic_samples: usize,
        #[arg(long)]
        epochs: Option<usize>,
        #[arg(long)]
        batch_size: Option<usize>,
        #[arg(long, default_value = "digit_classifier.bin")]
        checkpoint: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    // Инициализация логирования
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };

    match cli.command {
        Command::Clean {
            records,
            seed,
            output,
            drop_duplicates,
        } => {
            if let Some(records) = records {
                config.cleaning.records = records;
            }
            if let Some(seed) = seed {
                config.cleaning.seed = seed;
            }
            if drop_duplicates {
                config.cleaning.drop_duplicates = true;
            }

            let outcome = run_cleaning_pipeline(&config.cleaning, &output)
                .with_context(|| format!("cleaning pipeline failed for {}", output.display()))?;

            println!("{}", outcome.summary);
            tracing::info!("Cleaned data written to {}", output.display());
        }
        Command::Train {
            train_images,
            train_labels,
            test_images,
            test_labels,
            synthetic_samples,
            epochs,
            batch_size,
            checkpoint,
        } => {
            if let Some(epochs) = epochs {
                config.training.epochs = epochs;
            }
            if let Some(batch_size) = batch_size {
                config.training.batch_size = batch_size;
            }
            config.training.validate()?;

            let source = match (train_images, train_labels, test_images, test_labels) {
                (Some(train_images), Some(train_labels), Some(test_images), Some(test_labels)) => {
                    DigitSource::Idx {
                        train_images,
                        train_labels,
                        test_images,
                        test_labels,
                    }
                }
                _ => {
                    tracing::warn!("No IDX files given, training on synthetic digits");
                    DigitSource::Synthetic {
                        train_samples: synthetic_samples * 4 / 5,
                        test_samples: synthetic_samples - synthetic_samples * 4 / 5,
                    }
                }
            };

            let outcome = run_training_pipeline(&config.training, &source, &checkpoint, |metrics| {
                println!("{}", metrics)
            })
            .context("training pipeline failed")?;

            println!("{}", outcome.evaluation);
            if let Some((label, predicted)) = outcome.demo {
                println!("True Label: {}, Predicted Label: {}", label, predicted);
            }
            tracing::info!("Model parameters saved to {}", checkpoint.display());
        }
    }

    Ok(())
}
