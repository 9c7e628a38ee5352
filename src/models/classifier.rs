//! Полносвязный классификатор 784 → 128 → 64 → 10
//!
//! Два явных режима вместо флага train/eval: `forward` для инференса и
//! `forward_train`, который сохраняет промежуточные активации для backprop.

use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::datasets::digits::{IMAGE_PIXELS, NUM_CLASSES};
use crate::error::{PipelineError, Result};

/// Размеры слоев сети
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    pub inputs: usize,
    pub hidden: [usize; 2],
    pub classes: usize,
}

impl Topology {
    pub fn layer_sizes(&self) -> [usize; 4] {
        [self.inputs, self.hidden[0], self.hidden[1], self.classes]
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self {
            inputs: IMAGE_PIXELS,
            hidden: [128, 64],
            classes: NUM_CLASSES,
        }
    }
}

/// Аффинный слой: y = x·W + b, W имеет форму (inputs, outputs)
#[derive(Debug, Clone, PartialEq)]
pub struct DenseLayer {
    pub weights: Array2<f64>,
    pub bias: Array1<f64>,
}

impl DenseLayer {
    /// Инициализация U(-1/√fan_in, 1/√fan_in) для весов и смещений
    fn random<R: Rng>(inputs: usize, outputs: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (inputs as f64).sqrt();
        Self {
            weights: Array2::from_shape_simple_fn((inputs, outputs), || rng.gen_range(-bound..bound)),
            bias: Array1::from_shape_simple_fn(outputs, || rng.gen_range(-bound..bound)),
        }
    }

    pub fn inputs(&self) -> usize {
        self.weights.nrows()
    }

    pub fn outputs(&self) -> usize {
        self.weights.ncols()
    }

    fn affine(&self, x: &Array2<f64>) -> Array2<f64> {
        x.dot(&self.weights) + &self.bias
    }
}

/// Градиенты функции потерь по параметрам одного слоя
#[derive(Debug, Clone)]
pub struct LayerGradients {
    pub weights: Array2<f64>,
    pub bias: Array1<f64>,
}

/// Промежуточные значения прямого прохода, нужные для обратного
#[derive(Debug, Clone)]
pub struct ForwardCache {
    /// Вход каждого слоя (для первого слоя это сам батч)
    inputs: Vec<Array2<f64>>,
    /// Значения до активации; у последнего слоя это логиты
    pre_activations: Vec<Array2<f64>>,
}

impl ForwardCache {
    pub fn logits(&self) -> &Array2<f64> {
        // Кэш всегда содержит по одному элементу на слой
        &self.pre_activations[self.pre_activations.len() - 1]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DenseClassifier {
    topology: Topology,
    layers: Vec<DenseLayer>,
}

impl DenseClassifier {
    pub fn new<R: Rng>(rng: &mut R) -> Self {
        let topology = Topology::default();
        let sizes = topology.layer_sizes();
        let layers = sizes
            .windows(2)
            .map(|pair| DenseLayer::random(pair[0], pair[1], rng))
            .collect();

        Self { topology, layers }
    }

    /// Сборка модели из готовых параметров (используется при загрузке)
    pub fn from_layers(topology: Topology, layers: Vec<DenseLayer>) -> Result<Self> {
        let sizes = topology.layer_sizes();
        if layers.len() != sizes.len() - 1 {
            return Err(PipelineError::shape(
                format!("{} layers", sizes.len() - 1),
                format!("{} layers", layers.len()),
            ));
        }

        for (i, layer) in layers.iter().enumerate() {
            let expected = (sizes[i], sizes[i + 1]);
            let actual = (layer.inputs(), layer.outputs());
            if expected != actual || layer.bias.len() != expected.1 {
                return Err(PipelineError::shape(
                    format!("layer {} of {:?} with bias {}", i, expected, expected.1),
                    format!("{:?} with bias {}", actual, layer.bias.len()),
                ));
            }
        }

        Ok(Self { topology, layers })
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    pub(crate) fn layers_mut(&mut self) -> &mut [DenseLayer] {
        &mut self.layers
    }

    pub fn num_parameters(&self) -> usize {
        self.layers
            .iter()
            .map(|l| l.weights.len() + l.bias.len())
            .sum()
    }

    fn check_input(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() != self.topology.inputs {
            return Err(PipelineError::shape(
                format!("{} input features", self.topology.inputs),
                format!("{} input features", x.ncols()),
            ));
        }
        Ok(())
    }

    /// Инференс: логиты без softmax, форма (batch, classes)
    pub fn forward(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_input(x)?;

        let last = self.layers.len() - 1;
        let mut activation = x.clone();
        for (i, layer) in self.layers.iter().enumerate() {
            let z = layer.affine(&activation);
            activation = if i < last { relu(&z) } else { z };
        }

        Ok(activation)
    }

    /// Прямой проход для обучения
    pub fn forward_train(&self, x: &Array2<f64>) -> Result<ForwardCache> {
        self.check_input(x)?;

        let last = self.layers.len() - 1;
        let mut inputs = Vec::with_capacity(self.layers.len());
        let mut pre_activations = Vec::with_capacity(self.layers.len());

        let mut activation = x.clone();
        for (i, layer) in self.layers.iter().enumerate() {
            let z = layer.affine(&activation);
            let next = if i < last { relu(&z) } else { z.clone() };
            inputs.push(activation);
            pre_activations.push(z);
            activation = next;
        }

        Ok(ForwardCache {
            inputs,
            pre_activations,
        })
    }

    /// Обратный проход: средняя по батчу кросс-энтропия и градиенты всех слоев
    pub fn backward(
        &self,
        cache: &ForwardCache,
        labels: &[usize],
    ) -> Result<(f64, Vec<LayerGradients>)> {
        let (loss, mut delta) = softmax_cross_entropy(cache.logits(), labels)?;

        let mut gradients = Vec::with_capacity(self.layers.len());
        for i in (0..self.layers.len()).rev() {
            let a_prev = &cache.inputs[i];
            gradients.push(LayerGradients {
                weights: a_prev.t().dot(&delta),
                bias: delta.sum_axis(Axis(0)),
            });

            if i > 0 {
                let mask = cache.pre_activations[i - 1].mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });
                delta = delta.dot(&self.layers[i].weights.t()) * mask;
            }
        }

        gradients.reverse();
        Ok((loss, gradients))
    }

    /// Предсказанные классы (arg-max по логитам)
    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        Ok(argmax_rows(&self.forward(x)?))
    }
}

fn relu(z: &Array2<f64>) -> Array2<f64> {
    z.mapv(|v| v.max(0.0))
}

/// Softmax + кросс-энтропия. Возвращает среднюю потерю и градиент по логитам.
pub fn softmax_cross_entropy(logits: &Array2<f64>, labels: &[usize]) -> Result<(f64, Array2<f64>)> {
    let n = logits.nrows();
    if n != labels.len() {
        return Err(PipelineError::shape(
            format!("{} labels", n),
            format!("{} labels", labels.len()),
        ));
    }
    if n == 0 {
        return Err(PipelineError::DataQuality("cannot compute loss of an empty batch".to_string()));
    }

    let mut grad = Array2::zeros(logits.raw_dim());
    let mut total = 0.0;

    for ((row, mut grad_row), &label) in logits.rows().into_iter().zip(grad.rows_mut()).zip(labels) {
        if label >= row.len() {
            return Err(PipelineError::DataQuality(format!(
                "label {} is outside of 0..{}",
                label,
                row.len()
            )));
        }

        // Стабильный log-sum-exp
        let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let sum_exp: f64 = row.iter().map(|&v| (v - max).exp()).sum();
        let log_sum_exp = max + sum_exp.ln();

        total += log_sum_exp - row[label];

        for (g, &v) in grad_row.iter_mut().zip(row.iter()) {
            *g = (v - log_sum_exp).exp();
        }
        grad_row[label] -= 1.0;
    }

    let scale = n as f64;
    grad.mapv_inplace(|g| g / scale);
    Ok((total / scale, grad))
}

pub fn argmax_rows(scores: &Array2<f64>) -> Vec<usize> {
    scores
        .rows()
        .into_iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
                .0
        })
        .collect()
}
