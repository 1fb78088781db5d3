// src/classifier/dense.rs

//! Fully connected network loaded from a JSON weights file.
//!
//! File layout:
//!
//! ```json
//! {
//!   "input_size": 784,
//!   "layers": [
//!     { "weights": [[...784 floats...], ...], "bias": [...], "activation": "relu" },
//!     { "weights": [[...]], "bias": [...10 floats...], "activation": "softmax" }
//!   ]
//! }
//! ```
//!
//! `weights` is row-major `[outputs][inputs]`. The tensor is consumed in its
//! flattened `[1, N, N, 1]` order.

use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::classifier::Classifier;
use crate::raster::InputTensor;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Activation {
    #[default]
    Identity,
    Relu,
    Softmax,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DenseLayer {
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
    #[serde(default)]
    pub activation: Activation,
}

impl DenseLayer {
    fn inputs(&self) -> usize {
        self.weights.first().map_or(0, Vec::len)
    }

    fn outputs(&self) -> usize {
        self.weights.len()
    }

    fn forward(&self, input: &[f32]) -> Vec<f32> {
        let mut output: Vec<f32> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>() + b)
            .collect();
        match self.activation {
            Activation::Identity => {}
            Activation::Relu => output.iter_mut().for_each(|v| *v = v.max(0.0)),
            Activation::Softmax => softmax_in_place(&mut output),
        }
        output
    }
}

fn softmax_in_place(values: &mut [f32]) {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0;
    for v in values.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    if sum > 0.0 {
        values.iter_mut().for_each(|v| *v /= sum);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DenseClassifier {
    input_size: usize,
    layers: Vec<DenseLayer>,
}

impl DenseClassifier {
    /// Builds a classifier after checking that the layer shapes chain up.
    pub fn new(input_size: usize, layers: Vec<DenseLayer>) -> Result<Self> {
        let classifier = Self { input_size, layers };
        classifier.validate()?;
        Ok(classifier)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let classifier: DenseClassifier =
            serde_json::from_str(text).context("Malformed model JSON")?;
        classifier.validate()?;
        Ok(classifier)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read model file {}", path.display()))?;
        Self::from_json(&text)
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, DenseLayer::outputs)
    }

    fn validate(&self) -> Result<()> {
        ensure!(!self.layers.is_empty(), "model has no layers");
        let mut expected_inputs = self.input_size;
        for (index, layer) in self.layers.iter().enumerate() {
            ensure!(layer.outputs() > 0, "layer {} has no outputs", index);
            if layer.inputs() != expected_inputs {
                bail!(
                    "layer {} takes {} inputs, previous stage produces {}",
                    index,
                    layer.inputs(),
                    expected_inputs
                );
            }
            if let Some(row) = layer.weights.iter().position(|r| r.len() != expected_inputs) {
                bail!("layer {} weight row {} has the wrong length", index, row);
            }
            ensure!(
                layer.bias.len() == layer.outputs(),
                "layer {} has {} biases for {} outputs",
                index,
                layer.bias.len(),
                layer.outputs()
            );
            expected_inputs = layer.outputs();
        }
        Ok(())
    }
}

impl Classifier for DenseClassifier {
    fn predict(&self, input: &InputTensor) -> Result<Vec<f32>> {
        let data = input.as_slice();
        ensure!(
            data.len() == self.input_size,
            "input tensor {:?} has {} values, model expects {}",
            input.shape(),
            data.len(),
            self.input_size
        );
        let mut activations = data.to_vec();
        for layer in &self.layers {
            activations = layer.forward(&activations);
        }
        debug!("DenseClassifier: produced {} scores", activations.len());
        Ok(activations)
    }

    fn describe(&self) -> String {
        format!(
            "dense classifier ({} inputs, {} layers, {} outputs)",
            self.input_size,
            self.layers.len(),
            self.output_size()
        )
    }
}
