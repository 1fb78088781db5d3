// src/prediction/render.rs

//! Turns prediction outcomes into display lines.

use crate::config::DisplayMode;
use crate::prediction::{InferenceFailure, PredictionResult};

const ERROR_INDICATOR: &str = "error";
const FULL_PERCENT: &str = "100.0%";

/// Formats a probability as a percentage with two decimals.
///
/// Anything that would print as `100.00%` is shown as `100.0%`, so rounding
/// noise around certainty always reads the same.
pub fn format_percentage(probability: f32) -> String {
    let formatted = format!("{:.2}%", probability * 100.0);
    if formatted == "100.00%" {
        FULL_PERCENT.to_string()
    } else {
        formatted
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ResultRenderer {
    mode: DisplayMode,
    num_classes: usize,
}

impl ResultRenderer {
    pub fn new(mode: DisplayMode, num_classes: usize) -> Self {
        Self { mode, num_classes }
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// Number of display slots the mode uses.
    pub fn slots(&self) -> usize {
        match self.mode {
            DisplayMode::FullDistribution => self.num_classes,
            DisplayMode::ArgmaxOnly => 1,
        }
    }

    pub fn render(&self, outcome: &Result<PredictionResult, InferenceFailure>) -> Vec<String> {
        match outcome {
            Ok(result) => self.render_result(result),
            Err(_) => self.render_error(),
        }
    }

    pub fn render_result(&self, result: &PredictionResult) -> Vec<String> {
        match self.mode {
            DisplayMode::FullDistribution => result
                .distribution()
                .iter()
                .enumerate()
                .map(|(class, &p)| format!("{}: {}", class, format_percentage(p)))
                .collect(),
            DisplayMode::ArgmaxOnly => vec![format!(
                "Predicted: {} ({})",
                result.class(),
                format_percentage(result.confidence())
            )],
        }
    }

    /// One error indicator per slot.
    pub fn render_error(&self) -> Vec<String> {
        match self.mode {
            DisplayMode::FullDistribution => (0..self.num_classes)
                .map(|class| format!("{}: {}", class, ERROR_INDICATOR))
                .collect(),
            DisplayMode::ArgmaxOnly => vec![format!("Predicted: {}", ERROR_INDICATOR)],
        }
    }
}
