// src/classifier/mod.rs

//! Digit classifiers.
//!
//! The drawing surface treats the classifier as a black box: it hands over a
//! normalized `[1, N, N, 1]` tensor and gets back one score per class. The
//! prediction loop validates whatever comes back, so implementations are free
//! to return anything; a wrong-length answer is reported, not trusted.

pub mod dense;
pub mod fixed;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;

use crate::raster::InputTensor;

pub use dense::DenseClassifier;
pub use fixed::FixedClassifier;

/// Maps a normalized image tensor to a distribution over classes.
///
/// Implementations run on the inference worker thread, hence `Send + Sync`.
pub trait Classifier: Send + Sync {
    fn predict(&self, input: &InputTensor) -> Result<Vec<f32>>;

    /// Short human-readable description, used in logs.
    fn describe(&self) -> String {
        "classifier".to_string()
    }
}

/// Loads the classifier weights at `model_path`.
///
/// Failure here is fatal for a session: without a model no prediction can be
/// made, so the error names the offending file.
pub fn load(model_path: &Path, grid_size: usize) -> Result<Arc<dyn Classifier>> {
    let classifier = DenseClassifier::load(model_path)
        .with_context(|| format!("Failed to load classifier model {}", model_path.display()))?;
    let expected_inputs = grid_size * grid_size;
    if classifier.input_size() != expected_inputs {
        anyhow::bail!(
            "Classifier model {} expects {} inputs but the grid provides {}",
            model_path.display(),
            classifier.input_size(),
            expected_inputs
        );
    }
    info!("Loaded {}", classifier.describe());
    Ok(Arc::new(classifier))
}
