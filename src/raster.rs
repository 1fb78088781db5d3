// src/raster.rs

//! The single intensity buffer behind the drawing, and the tensor view the
//! classifier consumes.

use crate::grid::CellCoords;

/// Raw intensity of an inked cell.
pub const INK: u8 = 0;
/// Raw intensity of an untouched cell.
pub const BACKGROUND: u8 = 255;

/// N×N matrix of 8-bit intensities, row-major by `y` then `x`.
///
/// Only `BrushEngine` mutates it during a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterBuffer {
    dimension: usize,
    pixels: Vec<u8>,
}

impl RasterBuffer {
    /// Creates a buffer filled with background.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            pixels: vec![BACKGROUND; dimension * dimension],
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Intensity at `(x, y)`, or `None` off the grid.
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        self.index(x, y).map(|idx| self.pixels[idx])
    }

    /// Writes one intensity. Out-of-range positions are ignored and reported
    /// as `false`.
    pub(crate) fn set(&mut self, cell: CellCoords, value: u8) -> bool {
        match self.index(cell.x, cell.y) {
            Some(idx) => {
                self.pixels[idx] = value;
                true
            }
            None => false,
        }
    }

    /// Resets every cell to background.
    pub(crate) fn reset(&mut self) {
        self.pixels.fill(BACKGROUND);
    }

    /// Number of cells holding ink.
    pub fn ink_count(&self) -> usize {
        self.pixels.iter().filter(|&&v| v == INK).count()
    }

    /// Owned copy of the current contents.
    pub fn snapshot(&self) -> RasterSnapshot {
        RasterSnapshot {
            dimension: self.dimension,
            pixels: self.pixels.clone().into_boxed_slice(),
        }
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        if x < self.dimension && y < self.dimension {
            Some(y * self.dimension + x)
        } else {
            None
        }
    }
}

/// Immutable point-in-time copy of a `RasterBuffer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterSnapshot {
    dimension: usize,
    pixels: Box<[u8]>,
}

impl RasterSnapshot {
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x < self.dimension && y < self.dimension {
            Some(self.pixels[y * self.dimension + x])
        } else {
            None
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Converts the snapshot into the classifier input.
    ///
    /// Intensities are inverted and scaled: ink (0) becomes 1.0, background
    /// (255) becomes 0.0. This assumes a classifier trained on bright strokes
    /// over a dark background.
    pub fn to_normalized_tensor(&self) -> InputTensor {
        let data = self
            .pixels
            .iter()
            .map(|&raw| (BACKGROUND - raw) as f32 / BACKGROUND as f32)
            .collect();
        InputTensor {
            shape: [1, self.dimension, self.dimension, 1],
            data,
        }
    }
}

/// Normalized classifier input, shape `[batch, height, width, channel]`.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    shape: [usize; 4],
    data: Vec<f32>,
}

impl InputTensor {
    /// Builds a tensor from raw parts. `data.len()` must equal the product of
    /// `shape`.
    pub fn from_parts(shape: [usize; 4], data: Vec<f32>) -> Option<Self> {
        if shape.iter().product::<usize>() == data.len() {
            Some(Self { shape, data })
        } else {
            None
        }
    }

    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}
