// src/display/headless.rs

//! Headless display surface: records every command and mirrors cell colors.

use crate::color::Color;
use crate::display::DisplaySurface;
use crate::grid::{Grid, PixelRect};
use anyhow::{bail, Result};
use log::trace;

/// One command received by a `HeadlessSurface`.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCommand {
    DrawCell { bounds: PixelRect, color: Color },
    ClearAll { color: Color },
    ShowPrediction(Vec<String>),
    Present,
}

/// Surface that keeps a per-cell color model instead of drawing anything.
pub struct HeadlessSurface {
    grid: Grid,
    cells: Vec<Color>,
    prediction: Vec<String>,
    commands: Vec<SurfaceCommand>,
}

impl HeadlessSurface {
    pub fn new(grid: Grid, background: Color) -> Self {
        let n = grid.dimension();
        Self {
            grid,
            cells: vec![background; n * n],
            prediction: Vec::new(),
            commands: Vec::new(),
        }
    }

    /// Color currently shown for cell `(x, y)`.
    pub fn cell_color(&self, x: usize, y: usize) -> Option<Color> {
        let n = self.grid.dimension();
        if x < n && y < n {
            Some(self.cells[y * n + x])
        } else {
            None
        }
    }

    /// Prediction lines currently shown.
    pub fn prediction(&self) -> &[String] {
        &self.prediction
    }

    pub fn commands(&self) -> &[SurfaceCommand] {
        &self.commands
    }

    /// Returns and forgets the recorded commands.
    pub fn take_commands(&mut self) -> Vec<SurfaceCommand> {
        std::mem::take(&mut self.commands)
    }
}

impl DisplaySurface for HeadlessSurface {
    fn draw_cell(&mut self, bounds: PixelRect, color: Color) -> Result<()> {
        let size = self.grid.pixel_size();
        if bounds.width() != size || bounds.height() != size {
            bail!("HeadlessSurface: {:?} is not a single cell", bounds);
        }
        let Some(cell) = self.grid.cell_at(bounds.x1 as i64, bounds.y1 as i64) else {
            bail!("HeadlessSurface: {:?} lies outside the grid", bounds);
        };
        trace!("HeadlessSurface: draw_cell {:?} {:?}", cell, color);
        let n = self.grid.dimension();
        self.cells[cell.y * n + cell.x] = color;
        self.commands.push(SurfaceCommand::DrawCell { bounds, color });
        Ok(())
    }

    fn clear_all(&mut self, color: Color) -> Result<()> {
        trace!("HeadlessSurface: clear_all {:?}", color);
        self.cells.fill(color);
        self.commands.push(SurfaceCommand::ClearAll { color });
        Ok(())
    }

    fn show_prediction(&mut self, lines: &[String]) -> Result<()> {
        self.prediction = lines.to_vec();
        self.commands.push(SurfaceCommand::ShowPrediction(lines.to_vec()));
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        self.commands.push(SurfaceCommand::Present);
        Ok(())
    }
}
