//! Набор изображений цифр: загрузка из IDX (формат MNIST), проверка, батчи

use std::path::Path;

use ndarray::{Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::{PipelineError, Result};
use crate::preprocessing::PixelNormalizer;

pub const IMAGE_SIDE: usize = 28;
pub const IMAGE_PIXELS: usize = IMAGE_SIDE * IMAGE_SIDE;
pub const NUM_CLASSES: usize = 10;

const IDX_IMAGES_MAGIC: u32 = 0x0000_0803;
const IDX_LABELS_MAGIC: u32 = 0x0000_0801;

#[derive(Debug, Clone, PartialEq)]
pub struct DigitDataset {
    images: Array2<f64>,
    labels: Vec<usize>,
}

/// Один батч: изображения построчно и соответствующие метки
#[derive(Debug, Clone)]
pub struct Batch {
    pub images: Array2<f64>,
    pub labels: Vec<usize>,
}

impl DigitDataset {
    pub fn new(images: Array2<f64>, labels: Vec<usize>) -> Result<Self> {
        if images.ncols() != IMAGE_PIXELS {
            return Err(PipelineError::shape(
                format!("{} pixels per image", IMAGE_PIXELS),
                format!("{} pixels per image", images.ncols()),
            ));
        }
        if images.nrows() != labels.len() {
            return Err(PipelineError::shape(
                format!("{} labels", images.nrows()),
                format!("{} labels", labels.len()),
            ));
        }
        if let Some(bad) = labels.iter().find(|&&l| l >= NUM_CLASSES) {
            return Err(PipelineError::DataQuality(format!(
                "label {} is outside of 0..{}",
                bad, NUM_CLASSES
            )));
        }

        Ok(Self { images, labels })
    }

    /// Загрузка пары IDX-файлов (изображения + метки)
    pub fn from_idx_files(
        images_path: &Path,
        labels_path: &Path,
        normalizer: &PixelNormalizer,
    ) -> Result<Self> {
        let pixels = read_idx_images(&std::fs::read(images_path)?)?;
        let labels = read_idx_labels(&std::fs::read(labels_path)?)?;

        tracing::info!(
            "Loaded {} images from {} and {} labels from {}",
            pixels.nrows(),
            images_path.display(),
            labels.len(),
            labels_path.display()
        );

        Self::new(normalizer.transform(&pixels), labels)
    }

    /// Синтетический набор: у каждого класса свой случайный шаблон, образцы
    /// получаются из шаблона добавлением шума. При небольшом шуме классы
    /// линейно разделимы.
    pub fn synthetic(n_samples: usize, n_classes: usize, noise: f64, seed: u64) -> Result<Self> {
        if n_classes == 0 || n_classes > NUM_CLASSES {
            return Err(PipelineError::Config(format!(
                "synthetic dataset needs 1..={} classes, got {}",
                NUM_CLASSES, n_classes
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let prototypes: Vec<Vec<f64>> = (0..n_classes)
            .map(|_| {
                (0..IMAGE_PIXELS)
                    .map(|_| if rng.gen_bool(0.5) { 0.8 } else { -0.8 })
                    .collect()
            })
            .collect();

        let mut images = Array2::zeros((n_samples, IMAGE_PIXELS));
        let mut labels = Vec::with_capacity(n_samples);
        for (i, mut row) in images.rows_mut().into_iter().enumerate() {
            let label = i % n_classes;
            for (pixel, base) in row.iter_mut().zip(prototypes[label].iter()) {
                *pixel = base + rng.gen_range(-noise..=noise);
            }
            labels.push(label);
        }

        Self::new(images, labels)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn images(&self) -> &Array2<f64> {
        &self.images
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn sample(&self, index: usize) -> Option<(ArrayView1<'_, f64>, usize)> {
        let label = *self.labels.get(index)?;
        Some((self.images.row(index), label))
    }

    /// Батчи в исходном порядке
    pub fn batches(&self, batch_size: usize) -> BatchIter<'_> {
        BatchIter::new(self, (0..self.len()).collect(), batch_size)
    }

    /// Батчи в случайном порядке (перемешивание на каждую эпоху)
    pub fn shuffled_batches(&self, batch_size: usize, rng: &mut StdRng) -> BatchIter<'_> {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(rng);
        BatchIter::new(self, order, batch_size)
    }

    /// Разделение на две части: первые `ratio` доли и остаток
    pub fn split(&self, ratio: f64) -> Result<(DigitDataset, DigitDataset)> {
        if !(0.0..=1.0).contains(&ratio) {
            return Err(PipelineError::Config(format!("split ratio must be within [0, 1], got {}", ratio)));
        }
        let cut = (self.len() as f64 * ratio).round() as usize;
        let head: Vec<usize> = (0..cut).collect();
        let tail: Vec<usize> = (cut..self.len()).collect();

        Ok((self.subset(&head), self.subset(&tail)))
    }

    fn subset(&self, indices: &[usize]) -> DigitDataset {
        DigitDataset {
            images: self.images.select(Axis(0), indices),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}

pub struct BatchIter<'a> {
    dataset: &'a DigitDataset,
    order: Vec<usize>,
    batch_size: usize,
    position: usize,
}

impl<'a> BatchIter<'a> {
    fn new(dataset: &'a DigitDataset, order: Vec<usize>, batch_size: usize) -> Self {
        Self {
            dataset,
            order,
            batch_size: batch_size.max(1),
            position: 0,
        }
    }

    pub fn num_batches(&self) -> usize {
        (self.order.len() + self.batch_size - 1) / self.batch_size
    }
}

impl Iterator for BatchIter<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.position >= self.order.len() {
            return None;
        }
        let end = (self.position + self.batch_size).min(self.order.len());
        let indices = &self.order[self.position..end];
        self.position = end;

        Some(Batch {
            images: self.dataset.images.select(Axis(0), indices),
            labels: indices.iter().map(|&i| self.dataset.labels[i]).collect(),
        })
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32> {
    bytes
        .get(offset..offset + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| PipelineError::DataQuality("IDX header is truncated".to_string()))
}

fn read_idx_images(bytes: &[u8]) -> Result<Array2<u8>> {
    let magic = read_u32(bytes, 0)?;
    if magic != IDX_IMAGES_MAGIC {
        return Err(PipelineError::DataQuality(format!(
            "not an IDX image file (magic {:#010x})",
            magic
        )));
    }

    let count = read_u32(bytes, 4)? as usize;
    let rows = read_u32(bytes, 8)? as usize;
    let cols = read_u32(bytes, 12)? as usize;
    if rows * cols != IMAGE_PIXELS {
        return Err(PipelineError::shape(
            format!("{}x{} images", IMAGE_SIDE, IMAGE_SIDE),
            format!("{}x{} images", rows, cols),
        ));
    }

    let body = &bytes[16..];
    if body.len() != count * IMAGE_PIXELS {
        return Err(PipelineError::DataQuality(format!(
            "IDX image file declares {} images but holds {} bytes of pixels",
            count,
            body.len()
        )));
    }

    Array2::from_shape_vec((count, IMAGE_PIXELS), body.to_vec())
        .map_err(|e| PipelineError::shape(format!("({}, {})", count, IMAGE_PIXELS), e))
}

fn read_idx_labels(bytes: &[u8]) -> Result<Vec<usize>> {
    let magic = read_u32(bytes, 0)?;
    if magic != IDX_LABELS_MAGIC {
        return Err(PipelineError::DataQuality(format!(
            "not an IDX label file (magic {:#010x})",
            magic
        )));
    }

    let count = read_u32(bytes, 4)? as usize;
    let body = &bytes[8..];
    if body.len() != count {
        return Err(PipelineError::DataQuality(format!(
            "IDX label file declares {} labels but holds {}",
            count,
            body.len()
        )));
    }

    Ok(body.iter().map(|&b| b as usize).collect())
}
