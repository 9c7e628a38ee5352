use ml_pipelines::models::load_parameters;
use ml_pipelines::{
    run_cleaning_pipeline, run_training_pipeline, CleaningConfig, DigitSource, TrainingConfig,
};

#[test]
fn cleaning_pipeline_writes_complete_csv() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("cleaned.csv");

    let config = CleaningConfig {
        records: 250,
        seed: 7,
        ..Default::default()
    };
    let outcome = run_cleaning_pipeline(&config, &output).unwrap();

    assert_eq!(outcome.summary.missing_values, 0);
    assert!(outcome
        .table
        .records
        .iter()
        .all(|r| r.age_group.is_some() && r.purchase_category.is_some()));

    let csv = std::fs::read_to_string(&output).unwrap();
    let mut lines = csv.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("id,name,age,email,purchase_amount"));
    assert!(header.ends_with("purchase_category,age_group"));
    assert_eq!(lines.count(), 250);
}

#[test]
fn same_seed_gives_same_summary() {
    let dir = tempfile::tempdir().unwrap();
    let config = CleaningConfig {
        records: 120,
        ..Default::default()
    };

    let first = run_cleaning_pipeline(&config, &dir.path().join("a.csv")).unwrap();
    let second = run_cleaning_pipeline(&config, &dir.path().join("b.csv")).unwrap();
    assert_eq!(first.summary.to_string(), second.summary.to_string());
}

#[test]
fn training_pipeline_on_synthetic_digits() {
    let dir = tempfile::tempdir().unwrap();
    let checkpoint = dir.path().join("model.bin");

    let config = TrainingConfig {
        epochs: 4,
        batch_size: 16,
        ..Default::default()
    };
    let source = DigitSource::Synthetic {
        train_samples: 200,
        test_samples: 50,
    };

    let mut lines = Vec::new();
    let outcome = run_training_pipeline(&config, &source, &checkpoint, |metrics| {
        lines.push(metrics.to_string())
    })
    .unwrap();

    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("Epoch 1/4, Train Loss: "));
    assert_eq!(outcome.history.epochs.len(), 4);
    assert_eq!(outcome.evaluation.total, 50);
    assert!(outcome.evaluation.accuracy > 30.0);

    let (label, predicted) = outcome.demo.unwrap();
    assert!(label < 10 && predicted < 10);

    let restored = load_parameters(&checkpoint).unwrap();
    assert_eq!(restored, outcome.model);
}

#[test]
fn missing_idx_files_fail_before_training() {
    let dir = tempfile::tempdir().unwrap();
    let source = DigitSource::Idx {
        train_images: dir.path().join("train-images-idx3-ubyte"),
        train_labels: dir.path().join("train-labels-idx1-ubyte"),
        test_images: dir.path().join("t10k-images-idx3-ubyte"),
        test_labels: dir.path().join("t10k-labels-idx1-ubyte"),
    };

    let result = run_training_pipeline(
        &TrainingConfig::default(),
        &source,
        &dir.path().join("model.bin"),
        |_| {},
    );
    assert!(result.is_err());
    assert!(!dir.path().join("model.bin").exists());
}
