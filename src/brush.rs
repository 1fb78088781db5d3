// src/brush.rs

//! Brush stamping.
//!
//! A stamp covers `[x, x + k) × [y, y + k)` starting at the cell under the
//! pointer and growing toward increasing x and y. It is not centered on the
//! pointer. Cells past the grid edge are skipped. Every stamped cell is written
//! to the raster buffer and redrawn on the surface with the matching color.

use anyhow::Result;
use log::{debug, trace};

use crate::color::Color;
use crate::config::Config;
use crate::display::DisplaySurface;
use crate::grid::CellCoords;
use crate::raster::{BACKGROUND, INK};
use crate::session::Session;

/// What a stamp writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    Ink,
    Background,
}

impl Fill {
    /// Raw buffer intensity for this fill.
    pub fn value(self) -> u8 {
        match self {
            Fill::Ink => INK,
            Fill::Background => BACKGROUND,
        }
    }
}

/// A square, bounded, idempotent write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrushStamp {
    pub origin: CellCoords,
    pub extent: usize,
    pub fill: Fill,
}

impl BrushStamp {
    /// Cells covered by the stamp before clipping.
    pub fn cells(&self) -> impl Iterator<Item = CellCoords> + '_ {
        (0..self.extent).flat_map(move |i| {
            (0..self.extent).map(move |j| CellCoords::new(self.origin.x + i, self.origin.y + j))
        })
    }
}

/// Applies stamps to a session and mirrors them on a surface.
#[derive(Debug, Clone)]
pub struct BrushEngine {
    brush_size: usize,
    ink_color: Color,
    background_color: Color,
}

impl BrushEngine {
    pub fn new(brush_size: usize, ink_color: Color, background_color: Color) -> Self {
        Self {
            brush_size,
            ink_color,
            background_color,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.brush_size,
            config.colors.ink,
            config.colors.background,
        )
    }

    pub fn brush_size(&self) -> usize {
        self.brush_size
    }

    pub fn stamp_for(&self, origin: CellCoords, fill: Fill) -> BrushStamp {
        BrushStamp {
            origin,
            extent: self.brush_size,
            fill,
        }
    }

    fn color_for(&self, fill: Fill) -> Color {
        match fill {
            Fill::Ink => self.ink_color,
            Fill::Background => self.background_color,
        }
    }

    /// Stamps ink at `origin`.
    pub fn paint<S: DisplaySurface + ?Sized>(
        &self,
        session: &mut Session,
        surface: &mut S,
        origin: CellCoords,
    ) -> Result<usize> {
        self.apply(session, surface, self.stamp_for(origin, Fill::Ink))
    }

    /// Stamps background at `origin` (localized erase).
    pub fn erase<S: DisplaySurface + ?Sized>(
        &self,
        session: &mut Session,
        surface: &mut S,
        origin: CellCoords,
    ) -> Result<usize> {
        self.apply(session, surface, self.stamp_for(origin, Fill::Background))
    }

    /// Resets the whole drawing to background.
    pub fn clear<S: DisplaySurface + ?Sized>(
        &self,
        session: &mut Session,
        surface: &mut S,
    ) -> Result<()> {
        debug!("BrushEngine: clearing drawing");
        session.buffer_mut().reset();
        surface.clear_all(self.background_color)?;
        surface.present()
    }

    /// Applies one stamp. Returns the number of cells written after clipping.
    pub fn apply<S: DisplaySurface + ?Sized>(
        &self,
        session: &mut Session,
        surface: &mut S,
        stamp: BrushStamp,
    ) -> Result<usize> {
        let grid = *session.grid();
        let color = self.color_for(stamp.fill);
        let mut redraws = Vec::with_capacity(stamp.extent * stamp.extent);
        for cell in stamp.cells() {
            let Some(bounds) = grid.cell_bounds(cell.x, cell.y) else {
                trace!("BrushEngine: clipped ({}, {})", cell.x, cell.y);
                continue;
            };
            session.buffer_mut().set(cell, stamp.fill.value());
            redraws.push(bounds);
        }
        // The buffer holds the whole stamp before any redraw can fail.
        for bounds in &redraws {
            surface.draw_cell(*bounds, color)?;
        }
        if !redraws.is_empty() {
            surface.present()?;
        }
        trace!("BrushEngine: {:?} wrote {} cells", stamp, redraws.len());
        Ok(redraws.len())
    }
}
