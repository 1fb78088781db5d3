// src/config.rs

//! Defines the configuration structures for the `digit-pad` drawing surface.
//!
//! The structs deserialize from a JSON file. Every field has a default, so a
//! configuration file only needs to name the settings it changes. The defaults
//! reproduce the classic 28×28 digit pad: 10 px cells, a 2-cell brush and a
//! prediction every 100 ms.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::info;

use crate::color::{Color, NamedColor};

/// Environment variable naming a JSON configuration file.
pub const CONFIG_ENV_VAR: &str = "DIGIT_PAD_CONFIG";

/// Largest accepted `grid_size`. Keeps terminal positions inside `u16`.
pub const MAX_GRID_SIZE: usize = 1024;

/// Largest accepted `num_classes`, one prediction line each.
pub const MAX_NUM_CLASSES: usize = 1024;

// --- Top-Level Configuration Structure ---

/// Represents the complete configuration of a drawing session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Logical resolution N of the drawing grid (N×N cells).
    pub grid_size: usize,
    /// On-screen size of one cell, in pixels.
    pub pixel_size: u32,
    /// Extent k of the square brush stamp, in cells.
    pub brush_size: usize,
    /// Cadence of the capture→infer→render cycle.
    pub tick_interval_ms: u64,
    /// Location of the classifier weights.
    pub model_path: PathBuf,
    /// What the secondary pointer button does.
    pub erase_mode: EraseMode,
    /// How predictions are shown.
    pub display_mode: DisplayMode,
    /// Number of classes the classifier must return.
    pub num_classes: usize,
    /// Upper bound on one classifier call. A timeout counts as a failed inference.
    pub inference_timeout_ms: u64,
    /// What happens when a tick arrives while an inference is still running.
    pub tick_policy: TickPolicy,
    /// Colors used by the surface.
    pub colors: ColorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            grid_size: 28,
            pixel_size: 10,
            brush_size: 2,
            tick_interval_ms: 100,
            model_path: PathBuf::from("model.json"),
            erase_mode: EraseMode::default(),
            display_mode: DisplayMode::default(),
            num_classes: 10,
            inference_timeout_ms: 1000,
            tick_policy: TickPolicy::default(),
            colors: ColorConfig::default(),
        }
    }
}

/// Behavior bound to the secondary pointer button.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EraseMode {
    /// Erase a brush-sized block under the pointer.
    #[default]
    Localized,
    /// Reset the whole drawing.
    FullClear,
}

/// How a prediction is rendered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayMode {
    /// One line per class with its percentage.
    FullDistribution,
    /// A single line with the winning digit and its confidence.
    #[default]
    ArgmaxOnly,
}

/// Overrun policy for the prediction loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TickPolicy {
    /// Drop ticks while an inference is in flight. At most one inference runs.
    #[default]
    SkipWhileBusy,
    /// Block the tick until the classifier answers or times out.
    Sequential,
}

/// Colors used to paint cells.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ColorConfig {
    /// Color of inked cells.
    pub ink: Color,
    /// Color of background cells.
    pub background: Color,
    /// Color of the cell outlines. `null` turns the outline off.
    pub outline: Option<Color>,
}

impl Default for ColorConfig {
    fn default() -> Self {
        ColorConfig {
            ink: Color::Named(NamedColor::Black),
            background: Color::Named(NamedColor::White),
            outline: Some(Color::Named(NamedColor::Gray)),
        }
    }
}

impl Config {
    /// Parses a configuration from JSON text and validates it.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Config =
            serde_json::from_str(text).context("Failed to parse configuration JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        Self::from_json(&text)
            .with_context(|| format!("Invalid configuration file {}", path.display()))
    }

    /// Loads the configuration named by `explicit_path`, falling back to
    /// `DIGIT_PAD_CONFIG`, and finally to the defaults.
    pub fn load_or_default(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            info!("Loading configuration from {}", path.display());
            return Self::load(path);
        }
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => {
                let path = PathBuf::from(path);
                info!(
                    "Loading configuration from {} (via {})",
                    path.display(),
                    CONFIG_ENV_VAR
                );
                Self::load(&path)
            }
            None => {
                info!("No configuration file given, using defaults");
                let config = Config::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Rejects settings that would make the session meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.grid_size == 0 {
            bail!("grid_size must be at least 1");
        }
        if self.pixel_size == 0 {
            bail!("pixel_size must be at least 1");
        }
        if self.brush_size == 0 {
            bail!("brush_size must be at least 1");
        }
        if self.tick_interval_ms == 0 {
            bail!("tick_interval_ms must be at least 1");
        }
        if self.num_classes == 0 {
            bail!("num_classes must be at least 1");
        }
        if self.inference_timeout_ms == 0 {
            bail!("inference_timeout_ms must be at least 1");
        }
        if self.grid_size > MAX_GRID_SIZE {
            bail!(
                "grid_size {} exceeds the maximum of {}",
                self.grid_size,
                MAX_GRID_SIZE
            );
        }
        if self.num_classes > MAX_NUM_CLASSES {
            bail!(
                "num_classes {} exceeds the maximum of {}",
                self.num_classes,
                MAX_NUM_CLASSES
            );
        }
        let fits = u32::try_from(self.grid_size)
            .ok()
            .and_then(|n| n.checked_mul(self.pixel_size))
            .is_some();
        if !fits {
            bail!(
                "grid_size {} times pixel_size {} overflows the pixel range",
                self.grid_size,
                self.pixel_size
            );
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_millis(self.inference_timeout_ms)
    }
}
