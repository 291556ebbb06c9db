//! Dense neural network forward pass (CPU-only).
//!
//! Backs the `mlp` classifier artifact: hidden layers apply their own
//! activation, the last layer is expected to emit raw class scores.
//!
//! Design goals:
//! - Stable, deterministic, dependency-light.
//! - Explicit shape validation at load, so a bad export fails at startup.

use serde::{Deserialize, Serialize};

use crate::error::InferenceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Tanh,
    Sigmoid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayer {
    /// Weights shape: [out_dim][in_dim]
    pub weights: Vec<Vec<f64>>,
    /// Bias shape: [out_dim]
    pub bias: Vec<f64>,
    #[serde(default)]
    pub activation: Activation,
}

impl DenseLayer {
    fn out_dim(&self) -> usize {
        self.weights.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseNetwork {
    /// Expected input dimension.
    pub input_dim: usize,
    pub layers: Vec<DenseLayer>,
}

impl DenseNetwork {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.input_dim == 0 {
            return Err("input_dim must be > 0".to_string());
        }
        if self.layers.is_empty() {
            return Err("layers must not be empty".to_string());
        }

        let mut expected_in = self.input_dim;
        for (idx, layer) in self.layers.iter().enumerate() {
            if layer.out_dim() == 0 {
                return Err(format!("layer[{idx}] out_dim must be > 0"));
            }
            if layer.bias.len() != layer.out_dim() {
                return Err(format!(
                    "layer[{idx}] bias len {} != out_dim {}",
                    layer.bias.len(),
                    layer.out_dim()
                ));
            }
            for (r, row) in layer.weights.iter().enumerate() {
                if row.len() != expected_in {
                    return Err(format!(
                        "layer[{idx}] weights row {r} len {} != expected in_dim {expected_in}",
                        row.len()
                    ));
                }
                if row.iter().any(|v| !v.is_finite()) {
                    return Err(format!("layer[{idx}] weights contain non-finite values"));
                }
            }
            if layer.bias.iter().any(|v| !v.is_finite()) {
                return Err(format!("layer[{idx}] bias contain non-finite values"));
            }
            expected_in = layer.out_dim();
        }
        Ok(())
    }

    pub fn output_dim(&self) -> usize {
        self.layers.last().map(|l| l.out_dim()).unwrap_or(0)
    }

    pub fn forward(&self, input: &[f64]) -> Result<Vec<f64>, InferenceError> {
        if input.len() != self.input_dim {
            return Err(InferenceError::DimensionMismatch {
                stage: "mlp",
                got: input.len(),
                expected: self.input_dim,
            });
        }

        let mut x: Vec<f64> = input.to_vec();
        for layer in &self.layers {
            if layer.bias.len() != layer.out_dim() {
                return Err(InferenceError::DimensionMismatch {
                    stage: "mlp bias",
                    got: layer.bias.len(),
                    expected: layer.out_dim(),
                });
            }
            let mut y = Vec::with_capacity(layer.out_dim());
            // weights[o] is the o-th row (len = in_dim)
            for (row, bias) in layer.weights.iter().zip(&layer.bias) {
                if row.len() != x.len() {
                    return Err(InferenceError::DimensionMismatch {
                        stage: "mlp layer",
                        got: x.len(),
                        expected: row.len(),
                    });
                }
                let sum = bias + row.iter().zip(&x).map(|(w, v)| w * v).sum::<f64>();
                y.push(apply_activation(sum, layer.activation));
            }
            x = y;
        }

        Ok(x)
    }
}

fn apply_activation(x: f64, act: Activation) -> f64 {
    match act {
        Activation::Linear => x,
        Activation::Relu => x.max(0.0),
        Activation::Tanh => x.tanh(),
        Activation::Sigmoid => sigmoid(x),
    }
}

pub(crate) fn sigmoid(x: f64) -> f64 {
    // Numerically-stable sigmoid.
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

pub(crate) fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}
