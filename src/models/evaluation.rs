//! Оценка точности и инференс одного изображения

use std::fmt;

use ndarray::{ArrayView1, Axis};
use serde::Serialize;

use crate::datasets::DigitDataset;
use crate::error::Result;
use crate::models::classifier::{argmax_rows, DenseClassifier};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassAccuracy {
    pub label: usize,
    pub correct: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub correct: usize,
    pub total: usize,
    /// Проценты, 0..=100
    pub accuracy: f64,
    pub per_class: Vec<ClassAccuracy>,
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Accuracy: {:.2}%", self.accuracy)
    }
}

/// Прогон всей выборки в режиме инференса, сравнение arg-max с меткой
pub fn evaluate_model(
    model: &DenseClassifier,
    dataset: &DigitDataset,
    batch_size: usize,
) -> Result<EvaluationReport> {
    let n_classes = model.topology().classes;
    let mut per_class: Vec<ClassAccuracy> = (0..n_classes)
        .map(|label| ClassAccuracy {
            label,
            correct: 0,
            total: 0,
        })
        .collect();

    let mut correct = 0;
    let mut total = 0;
    for batch in dataset.batches(batch_size) {
        let predicted = argmax_rows(&model.forward(&batch.images)?);
        for (&label, &guess) in batch.labels.iter().zip(predicted.iter()) {
            let class = &mut per_class[label];
            class.total += 1;
            if label == guess {
                class.correct += 1;
                correct += 1;
            }
            total += 1;
        }
    }

    let accuracy = if total == 0 {
        0.0
    } else {
        correct as f64 / total as f64 * 100.0
    };

    tracing::info!("Evaluated {} samples: {}/{} correct", total, correct, total);

    Ok(EvaluationReport {
        correct,
        total,
        accuracy,
        per_class,
    })
}

/// Предсказание класса для одного изображения
pub fn predict_sample(model: &DenseClassifier, image: ArrayView1<'_, f64>) -> Result<usize> {
    let batch = image.to_owned().insert_axis(Axis(0));
    let predicted = model.predict(&batch)?;
    Ok(predicted[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use ndarray::Array1;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn accuracy_within_bounds_and_total_matches() {
        let model = DenseClassifier::new(&mut StdRng::seed_from_u64(4));
        for n in [1usize, 7, 33] {
            let data = DigitDataset::synthetic(n, 10, 0.2, n as u64).unwrap();
            let report = evaluate_model(&model, &data, 8).unwrap();

            assert_eq!(report.total, n);
            assert!((0.0..=100.0).contains(&report.accuracy));
            assert_eq!(report.per_class.iter().map(|c| c.total).sum::<usize>(), n);
            assert_eq!(report.per_class.iter().map(|c| c.correct).sum::<usize>(), report.correct);
        }
    }

    #[test]
    fn empty_dataset_gives_zero_accuracy() {
        let model = DenseClassifier::new(&mut StdRng::seed_from_u64(4));
        let (_, empty) = DigitDataset::synthetic(4, 2, 0.2, 1).unwrap().split(1.0).unwrap();

        let report = evaluate_model(&model, &empty, 8).unwrap();
        assert_eq!(report.total, 0);
        assert_eq!(report.accuracy, 0.0);
    }

    #[test]
    fn single_sample_prediction_matches_batch_prediction() {
        let model = DenseClassifier::new(&mut StdRng::seed_from_u64(4));
        let data = DigitDataset::synthetic(5, 10, 0.2, 9).unwrap();

        let batch_predictions = model.predict(data.images()).unwrap();
        for (i, expected) in batch_predictions.iter().enumerate() {
            let (image, _) = data.sample(i).unwrap();
            assert_eq!(predict_sample(&model, image).unwrap(), *expected);
        }
    }

    #[test]
    fn wrong_sized_image_rejected() {
        let model = DenseClassifier::new(&mut StdRng::seed_from_u64(4));
        let image = Array1::<f64>::zeros(28);

        let err = predict_sample(&model, image.view()).unwrap_err();
        assert!(matches!(err, PipelineError::ShapeMismatch { .. }));
    }

    #[test]
    fn report_line_format() {
        let report = EvaluationReport {
            correct: 9741,
            total: 10000,
            accuracy: 97.41,
            per_class: Vec::new(),
        };
        assert_eq!(report.to_string(), "Accuracy: 97.41%");
    }
}
