//! Нормализация пикселей изображений

use ndarray::Array2;

use crate::error::{PipelineError, Result};

/// Приводит интенсивности 0..=255 к [0, 1], затем нормализует: (x - mean) / std.
/// При mean = std = 0.5 результат лежит в [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelNormalizer {
    mean: f64,
    std: f64,
}

impl PixelNormalizer {
    pub fn new(mean: f64, std: f64) -> Result<Self> {
        if std <= 1e-10 {
            return Err(PipelineError::Config(format!(
                "pixel std must be positive, got {}",
                std
            )));
        }
        Ok(Self { mean, std })
    }

    pub fn normalize(&self, pixel: u8) -> f64 {
        (pixel as f64 / 255.0 - self.mean) / self.std
    }

    /// Нормализация строк изображений (n_samples, n_pixels)
    pub fn transform(&self, pixels: &Array2<u8>) -> Array2<f64> {
        pixels.mapv(|p| self.normalize(p))
    }
}

impl Default for PixelNormalizer {
    fn default() -> Self {
        Self { mean: 0.5, std: 0.5 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn default_maps_to_unit_interval() {
        let normalizer = PixelNormalizer::default();
        let out = normalizer.transform(&array![[0u8, 255], [51, 204]]);

        assert_eq!(out[[0, 0]], -1.0);
        assert_eq!(out[[0, 1]], 1.0);
        assert!((out[[1, 0]] + 0.6).abs() < 1e-12);
        assert!((out[[1, 1]] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn zero_std_rejected() {
        assert!(PixelNormalizer::new(0.5, 0.0).is_err());
    }
}
