//! Сохранение и загрузка параметров модели
//!
//! Файл содержит все веса и смещения целиком, частичных чекпоинтов нет.
//! Значения хранятся как есть (postcard), поэтому после загрузки модель
//! дает побитово те же логиты.

use std::path::Path;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::models::classifier::{DenseClassifier, DenseLayer, Topology};

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Checkpoint {
    format_version: u32,
    topology: Topology,
    layers: Vec<LayerParameters>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LayerParameters {
    inputs: usize,
    outputs: usize,
    /// Построчно, форма (inputs, outputs)
    weights: Vec<f64>,
    bias: Vec<f64>,
}

pub fn save_parameters(model: &DenseClassifier, path: &Path) -> Result<()> {
    let checkpoint = Checkpoint {
        format_version: FORMAT_VERSION,
        topology: model.topology(),
        layers: model
            .layers()
            .iter()
            .map(|layer| LayerParameters {
                inputs: layer.inputs(),
                outputs: layer.outputs(),
                weights: layer.weights.iter().copied().collect(),
                bias: layer.bias.to_vec(),
            })
            .collect(),
    };

    let bytes = postcard::to_allocvec(&checkpoint).map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
    })?;
    std::fs::write(path, &bytes)?;

    tracing::info!(
        "Saved {} parameters ({} bytes) to {}",
        model.num_parameters(),
        bytes.len(),
        path.display()
    );
    Ok(())
}

/// Загрузка в новый экземпляр модели. Топология файла должна совпадать с объявленной.
pub fn load_parameters(path: &Path) -> Result<DenseClassifier> {
    let bytes = std::fs::read(path).map_err(|e| {
        PipelineError::ParameterLoad(format!("cannot read {}: {}", path.display(), e))
    })?;

    let checkpoint: Checkpoint = postcard::from_bytes(&bytes).map_err(|e| {
        PipelineError::ParameterLoad(format!("{} is not a valid checkpoint: {}", path.display(), e))
    })?;

    if checkpoint.format_version != FORMAT_VERSION {
        return Err(PipelineError::ParameterLoad(format!(
            "unsupported checkpoint version {} (expected {})",
            checkpoint.format_version, FORMAT_VERSION
        )));
    }

    let expected = Topology::default();
    if checkpoint.topology != expected {
        return Err(PipelineError::ParameterLoad(format!(
            "checkpoint topology {:?} does not match model topology {:?}",
            checkpoint.topology, expected
        )));
    }

    let layers = checkpoint
        .layers
        .into_iter()
        .map(|p| {
            let weights = Array2::from_shape_vec((p.inputs, p.outputs), p.weights)
                .map_err(|e| PipelineError::ParameterLoad(format!("bad weight matrix: {}", e)))?;
            Ok(DenseLayer {
                weights,
                bias: Array1::from(p.bias),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let model = DenseClassifier::from_layers(checkpoint.topology, layers)
        .map_err(|e| PipelineError::ParameterLoad(e.to_string()))?;

    tracing::info!("Loaded {} parameters from {}", model.num_parameters(), path.display());
    Ok(model)
}
