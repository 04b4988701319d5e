use serde::{Deserialize, Serialize};

use crate::model::ModelError;

/// Maps standardized feature rows to one probability row per input.
pub trait Classifier {
    fn n_features(&self) -> usize;
    fn n_classes(&self) -> usize;
    fn predict(&self, features: &[Vec<f64>]) -> Vec<Vec<f64>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Linear,
    Relu,
    Sigmoid,
    Tanh,
    Softmax,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    /// `weights[input][output]`
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    pub activation: Activation,
}

impl DenseLayer {
    pub fn n_inputs(&self) -> usize {
        self.weights.len()
    }

    pub fn n_outputs(&self) -> usize {
        self.bias.len()
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        let mut out = self.bias.clone();
        for (x, row) in input.iter().zip(self.weights.iter()) {
            for (o, w) in out.iter_mut().zip(row.iter()) {
                *o += x * w;
            }
        }
        apply_activation(self.activation, &mut out);
        out
    }
}

/// Feed-forward network exported from the training side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseNetwork {
    pub layers: Vec<DenseLayer>,
}

impl DenseNetwork {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.layers.is_empty() {
            return Err(ModelError::Invalid("classifier has no layers".to_string()));
        }
        let mut expected_inputs: Option<usize> = None;
        for (idx, layer) in self.layers.iter().enumerate() {
            if layer.n_inputs() == 0 || layer.n_outputs() == 0 {
                return Err(ModelError::Invalid(format!("layer {} is empty", idx)));
            }
            if let Some(expected) = expected_inputs {
                if layer.n_inputs() != expected {
                    return Err(ModelError::Invalid(format!(
                        "layer {} expects {} inputs but previous layer emits {}",
                        idx,
                        layer.n_inputs(),
                        expected
                    )));
                }
            }
            for row in &layer.weights {
                if row.len() != layer.n_outputs() {
                    return Err(ModelError::Invalid(format!(
                        "layer {} weight row has {} outputs, bias has {}",
                        idx,
                        row.len(),
                        layer.n_outputs()
                    )));
                }
                if row.iter().any(|w| !w.is_finite()) {
                    return Err(ModelError::Invalid(format!(
                        "layer {} has non-finite weights",
                        idx
                    )));
                }
            }
            if layer.bias.iter().any(|b| !b.is_finite()) {
                return Err(ModelError::Invalid(format!(
                    "layer {} has non-finite bias",
                    idx
                )));
            }
            expected_inputs = Some(layer.n_outputs());
        }
        Ok(())
    }
}

impl Classifier for DenseNetwork {
    fn n_features(&self) -> usize {
        self.layers.first().map(|l| l.n_inputs()).unwrap_or(0)
    }

    fn n_classes(&self) -> usize {
        self.layers.last().map(|l| l.n_outputs()).unwrap_or(0)
    }

    fn predict(&self, features: &[Vec<f64>]) -> Vec<Vec<f64>> {
        features
            .iter()
            .map(|row| {
                let mut current = row.clone();
                for layer in &self.layers {
                    current = layer.forward(&current);
                }
                current
            })
            .collect()
    }
}

fn apply_activation(activation: Activation, values: &mut [f64]) {
    match activation {
        Activation::Linear => {}
        Activation::Relu => {
            for v in values.iter_mut() {
                *v = v.max(0.0);
            }
        }
        Activation::Sigmoid => {
            for v in values.iter_mut() {
                *v = 1.0 / (1.0 + (-*v).exp());
            }
        }
        Activation::Tanh => {
            for v in values.iter_mut() {
                *v = v.tanh();
            }
        }
        Activation::Softmax => softmax_in_place(values),
    }
}

pub fn softmax_in_place(values: &mut [f64]) {
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mut sum = 0.0;
    for v in values.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    if sum > 0.0 {
        for v in values.iter_mut() {
            *v /= sum;
        }
    }
}
