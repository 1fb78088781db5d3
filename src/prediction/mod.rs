// src/prediction/mod.rs

//! The capture→infer→render cycle.
//!
//! - `ticker` fires the cycle at a fixed cadence and can be stopped.
//! - `worker` runs classifier calls off the input thread.
//! - `prediction_loop` is the per-tick state machine and owns the timing rules.
//! - `render` turns a result (or a failure) into display lines.

pub mod prediction_loop;
pub mod render;
pub mod ticker;
pub mod worker;

use std::fmt;
use std::time::Duration;

pub use prediction_loop::{LoopState, LoopStats, PredictionLoop, TickOutcome};
pub use render::ResultRenderer;
pub use ticker::Ticker;
pub use worker::{InferenceJob, InferenceReply, InferenceWorker};

/// A validated classifier answer.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    distribution: Vec<f32>,
    class: usize,
    confidence: f32,
}

impl PredictionResult {
    /// Validates a raw classifier output.
    ///
    /// The output must hold exactly `num_classes` finite, non-negative values.
    /// Values need not sum to exactly one. Ties go to the lowest class.
    pub fn from_distribution(
        distribution: Vec<f32>,
        num_classes: usize,
    ) -> Result<Self, InferenceFailure> {
        if distribution.len() != num_classes {
            return Err(InferenceFailure::ShapeMismatch {
                expected: num_classes,
                actual: distribution.len(),
            });
        }
        if let Some((index, &value)) = distribution
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(InferenceFailure::InvalidValue { index, value });
        }
        let (class, confidence) = distribution.iter().copied().enumerate().fold(
            (0, f32::NEG_INFINITY),
            |best, (i, v)| if v > best.1 { (i, v) } else { best },
        );
        Ok(Self {
            distribution,
            class,
            confidence,
        })
    }

    pub fn distribution(&self) -> &[f32] {
        &self.distribution
    }

    /// The most probable class.
    pub fn class(&self) -> usize {
        self.class
    }

    /// Score of `class()`.
    pub fn confidence(&self) -> f32 {
        self.confidence
    }
}

/// Why a tick produced no prediction. None of these stop the loop.
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceFailure {
    /// The classifier answered with the wrong number of classes.
    ShapeMismatch { expected: usize, actual: usize },
    /// A score was negative, NaN or infinite.
    InvalidValue { index: usize, value: f32 },
    /// The classifier returned an error.
    Classifier(String),
    /// No answer within the configured timeout.
    TimedOut(Duration),
    /// The inference worker is gone.
    WorkerUnavailable,
}

impl fmt::Display for InferenceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceFailure::ShapeMismatch { expected, actual } => write!(
                f,
                "classifier returned {} scores, expected {}",
                actual, expected
            ),
            InferenceFailure::InvalidValue { index, value } => {
                write!(f, "classifier score {} is invalid ({})", index, value)
            }
            InferenceFailure::Classifier(message) => write!(f, "classifier failed: {}", message),
            InferenceFailure::TimedOut(limit) => {
                write!(f, "classifier did not answer within {:?}", limit)
            }
            InferenceFailure::WorkerUnavailable => write!(f, "inference worker is not running"),
        }
    }
}
