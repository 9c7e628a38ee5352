//! Adam: адаптивный шаг по первому и второму моментам градиента

use ndarray::{Array1, Array2, Zip};

use crate::config::TrainingConfig;
use crate::error::{PipelineError, Result};
use crate::models::classifier::{DenseClassifier, LayerGradients};

#[derive(Debug, Clone)]
struct Moments {
    m_weights: Array2<f64>,
    v_weights: Array2<f64>,
    m_bias: Array1<f64>,
    v_bias: Array1<f64>,
}

#[derive(Debug, Clone)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    step: i32,
    moments: Vec<Moments>,
}

impl Adam {
    pub fn new(learning_rate: f64, beta1: f64, beta2: f64, epsilon: f64) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            step: 0,
            moments: Vec::new(),
        }
    }

    pub fn from_config(config: &TrainingConfig) -> Self {
        Self::new(config.learning_rate, config.beta1, config.beta2, config.epsilon)
    }

    pub fn steps_taken(&self) -> i32 {
        self.step
    }

    /// Одно обновление всех параметров модели на месте
    pub fn step(&mut self, model: &mut DenseClassifier, gradients: &[LayerGradients]) -> Result<()> {
        let layers = model.layers_mut();
        if layers.len() != gradients.len() {
            return Err(PipelineError::shape(
                format!("{} gradient sets", layers.len()),
                format!("{} gradient sets", gradients.len()),
            ));
        }

        // Моменты создаются лениво по форме параметров
        if self.moments.is_empty() {
            self.moments = layers
                .iter()
                .map(|l| Moments {
                    m_weights: Array2::zeros(l.weights.raw_dim()),
                    v_weights: Array2::zeros(l.weights.raw_dim()),
                    m_bias: Array1::zeros(l.bias.len()),
                    v_bias: Array1::zeros(l.bias.len()),
                })
                .collect();
        }

        self.step += 1;
        let (beta1, beta2, eps, lr) = (self.beta1, self.beta2, self.epsilon, self.learning_rate);
        let correction1 = 1.0 - beta1.powi(self.step);
        let correction2 = 1.0 - beta2.powi(self.step);

        let update = |param: &mut f64, m: &mut f64, v: &mut f64, g: f64| {
            *m = beta1 * *m + (1.0 - beta1) * g;
            *v = beta2 * *v + (1.0 - beta2) * g * g;
            let m_hat = *m / correction1;
            let v_hat = *v / correction2;
            *param -= lr * m_hat / (v_hat.sqrt() + eps);
        };

        for ((layer, moments), grads) in layers.iter_mut().zip(self.moments.iter_mut()).zip(gradients) {
            if grads.weights.raw_dim() != layer.weights.raw_dim() || grads.bias.len() != layer.bias.len() {
                return Err(PipelineError::shape(
                    format!("{:?}", layer.weights.dim()),
                    format!("{:?}", grads.weights.dim()),
                ));
            }

            Zip::from(&mut layer.weights)
                .and(&mut moments.m_weights)
                .and(&mut moments.v_weights)
                .and(&grads.weights)
                .for_each(|w, m, v, &g| update(w, m, v, g));

            Zip::from(&mut layer.bias)
                .and(&mut moments.m_bias)
                .and(&mut moments.v_bias)
                .and(&grads.bias)
                .for_each(|b, m, v, &g| update(b, m, v, g));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::classifier::Topology;
    use ndarray::Array2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn constant_gradients(model: &DenseClassifier, value: f64) -> Vec<LayerGradients> {
        model
            .layers()
            .iter()
            .map(|l| LayerGradients {
                weights: Array2::from_elem(l.weights.raw_dim(), value),
                bias: Array1::from_elem(l.bias.len(), value),
            })
            .collect()
    }

    #[test]
    fn first_step_moves_by_learning_rate() {
        // После коррекции смещения первый шаг равен lr * sign(g)
        let mut model = DenseClassifier::new(&mut StdRng::seed_from_u64(1));
        let before = model.clone();
        let grads = constant_gradients(&model, 0.3);

        let mut adam = Adam::new(0.01, 0.9, 0.999, 1e-8);
        adam.step(&mut model, &grads).unwrap();

        assert_eq!(adam.steps_taken(), 1);
        for (after, before) in model.layers().iter().zip(before.layers()) {
            let delta = &before.weights - &after.weights;
            assert!(delta.iter().all(|d| (d - 0.01).abs() < 1e-6));
            let delta = &before.bias - &after.bias;
            assert!(delta.iter().all(|d| (d - 0.01).abs() < 1e-6));
        }
    }

    #[test]
    fn mismatched_gradients_rejected() {
        let mut model = DenseClassifier::new(&mut StdRng::seed_from_u64(1));
        let mut grads = constant_gradients(&model, 1.0);
        grads.pop();

        let err = Adam::new(0.01, 0.9, 0.999, 1e-8).step(&mut model, &grads).unwrap_err();
        assert!(matches!(err, PipelineError::ShapeMismatch { .. }));
        assert_eq!(model.topology(), Topology::default());
    }
}
