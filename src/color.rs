// src/color.rs

//! Defines color-related enums (`NamedColor`, `Color`) and their RGB resolution.

use serde::{Deserialize, Serialize};

/// Named colors used by the default palette: ink, background and outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamedColor {
    Black,
    White,
    Gray,
}

impl NamedColor {
    /// Returns the `Color::Rgb` representation of this named color.
    pub fn to_rgb_color(&self) -> Color {
        match self {
            NamedColor::Black => Color::Rgb(0, 0, 0),
            NamedColor::White => Color::Rgb(255, 255, 255),
            NamedColor::Gray => Color::Rgb(127, 127, 127),
        }
    }
}

/// A color as understood by a `DisplaySurface`.
///
/// In a configuration file either form is accepted:
/// `{ "named": "black" }` or `{ "rgb": [12, 34, 56] }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Color {
    Named(NamedColor),
    Rgb(u8, u8, u8),
}

impl Color {
    /// Resolves the color to concrete `(r, g, b)` components.
    pub fn to_rgb(self) -> (u8, u8, u8) {
        match self {
            Color::Named(named) => named.to_rgb_color().to_rgb(),
            Color::Rgb(r, g, b) => (r, g, b),
        }
    }
}

impl From<NamedColor> for Color {
    fn from(named: NamedColor) -> Self {
        Color::Named(named)
    }
}
