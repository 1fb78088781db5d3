// src/grid.rs

//! Coordinate mapping between logical grid cells and on-screen pixels.
//!
//! The grid is square, `dimension` cells on each side, and every cell covers a
//! `pixel_size`×`pixel_size` block of pixels. Cell `(x, y)` names the column
//! first, so its box starts at `(x * pixel_size, y * pixel_size)`.

/// A cell position on the grid, `x` being the column and `y` the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CellCoords {
    pub x: usize,
    pub y: usize,
}

impl CellCoords {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned pixel rectangle, half-open: `[x1, x2) × [y1, y2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl PixelRect {
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    /// True when the pixel `(px, py)` lies inside the rectangle.
    pub fn contains(&self, px: i64, py: i64) -> bool {
        px >= self.x1 as i64 && px < self.x2 as i64 && py >= self.y1 as i64 && py < self.y2 as i64
    }
}

/// Immutable mapping between cells and pixel boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    dimension: usize,
    pixel_size: u32,
}

impl Grid {
    /// Creates a `dimension`×`dimension` grid of `pixel_size` pixel cells.
    ///
    /// Both values are expected to be non-zero, and `dimension * pixel_size`
    /// must fit in `u32`. `Config::validate` enforces this for grids built
    /// from configuration.
    pub fn new(dimension: usize, pixel_size: u32) -> Self {
        debug_assert!(dimension > 0 && pixel_size > 0);
        debug_assert!(u32::try_from(dimension)
            .ok()
            .and_then(|n| n.checked_mul(pixel_size))
            .is_some());
        Self {
            dimension,
            pixel_size,
        }
    }

    /// Number of cells along each axis (N).
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn pixel_size(&self) -> u32 {
        self.pixel_size
    }

    /// Total width (and height) of the surface in pixels.
    pub fn pixel_extent(&self) -> u32 {
        self.dimension as u32 * self.pixel_size
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        let n = self.dimension as i64;
        (0..n).contains(&x) && (0..n).contains(&y)
    }

    /// Pixel box of cell `(i, j)`. `None` outside the grid.
    pub fn cell_bounds(&self, i: usize, j: usize) -> Option<PixelRect> {
        if i >= self.dimension || j >= self.dimension {
            return None;
        }
        let x1 = i as u32 * self.pixel_size;
        let y1 = j as u32 * self.pixel_size;
        Some(PixelRect {
            x1,
            y1,
            x2: x1 + self.pixel_size,
            y2: y1 + self.pixel_size,
        })
    }

    /// Floor-divides a pixel position by the cell size.
    ///
    /// The result is not range checked: it can be negative or `>= dimension`.
    /// Callers drop such positions; they are never wrapped or clamped.
    pub fn pixel_to_cell(&self, px: i64, py: i64) -> (i64, i64) {
        let size = self.pixel_size as i64;
        (px.div_euclid(size), py.div_euclid(size))
    }

    /// The cell under a pixel, or `None` when the pixel is off the grid.
    pub fn cell_at(&self, px: i64, py: i64) -> Option<CellCoords> {
        let (x, y) = self.pixel_to_cell(px, py);
        if self.contains(x, y) {
            Some(CellCoords::new(x as usize, y as usize))
        } else {
            None
        }
    }
}
