// src/display/console.rs

//! ANSI terminal surface.
//!
//! Every grid cell is drawn as two terminal columns by one row, painted with a
//! 24-bit SGR background color. With an outline color set, each cell also gets
//! an underline and a right-edge bar in that color, which draws the grid lines. Prediction lines are written below the grid.
//! Output is accumulated in memory and written out on `present()`.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use log::{debug, trace};

use crate::color::Color;
use crate::display::DisplaySurface;
use crate::grid::{Grid, PixelRect};

const CSI: &str = "\x1b[";
const SGR_RESET: &str = "\x1b[0m";
const ERASE_LINE: &str = "\x1b[2K";
const UNDERLINE: &str = "\x1b[4m";
// Right one-eighth block: a thin bar on the cell's right edge.
const RIGHT_EDGE: char = '\u{2595}';

/// Terminal columns used by one grid cell.
pub const COLUMNS_PER_CELL: u16 = 2;

/// Placement of the grid inside the terminal. Positions are 1-based, as in
/// ANSI cursor addressing and mouse reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleLayout {
    pub origin_row: u16,
    pub origin_col: u16,
    pub grid: Grid,
}

impl ConsoleLayout {
    /// Grid starts below a one-line header, indented by two columns.
    pub fn new(grid: Grid) -> Self {
        Self {
            origin_row: 2,
            origin_col: 3,
            grid,
        }
    }

    /// Terminal position (row, col) of the top-left character of cell `(x, y)`.
    pub fn cell_position(&self, x: usize, y: usize) -> (u16, u16) {
        (
            self.origin_row + y as u16,
            self.origin_col + x as u16 * COLUMNS_PER_CELL,
        )
    }

    /// Maps a 1-based terminal position to surface pixels.
    ///
    /// Positions left of or above the grid map to negative pixels, positions
    /// past it map beyond the pixel extent, so the grid's own bounds check
    /// decides whether the event lands on a cell.
    pub fn terminal_to_pixel(&self, col: u16, row: u16) -> (i64, i64) {
        let size = self.grid.pixel_size() as i64;
        let rel_col = col as i64 - self.origin_col as i64;
        let rel_row = row as i64 - self.origin_row as i64;
        let px = (rel_col * size).div_euclid(COLUMNS_PER_CELL as i64);
        let py = rel_row * size + size / 2;
        (px, py)
    }

    /// First row below the grid.
    pub fn prediction_row(&self) -> u16 {
        self.origin_row + self.grid.dimension() as u16 + 1
    }
}

/// Terminal-backed `DisplaySurface`, generic over its output for testing.
pub struct ConsoleSurface<W: Write> {
    out: W,
    layout: ConsoleLayout,
    pending: String,
    shown_prediction_lines: usize,
    outline: Option<Color>,
}

impl<W: Write> ConsoleSurface<W> {
    pub fn new(out: W, layout: ConsoleLayout) -> Self {
        Self {
            out,
            layout,
            pending: String::new(),
            shown_prediction_lines: 0,
            outline: None,
        }
    }

    /// Outlines every cell in `color`. `None` paints solid blocks.
    pub fn with_outline(mut self, outline: Option<Color>) -> Self {
        self.outline = outline;
        self
    }

    pub fn layout(&self) -> ConsoleLayout {
        self.layout
    }

    /// Writes the header line. The caller paints the grid itself.
    pub fn draw_header(&mut self, text: &str) {
        let _ = write!(self.pending, "{CSI}1;1H{ERASE_LINE}{text}");
    }

    /// Gives back the writer, for inspection in tests.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn queue_cell(&mut self, x: usize, y: usize, color: Color) {
        let (row, col) = self.layout.cell_position(x, y);
        let (r, g, b) = color.to_rgb();
        match self.outline {
            Some(outline) => {
                let (or, og, ob) = outline.to_rgb();
                let _ = write!(
                    self.pending,
                    "{CSI}{row};{col}H{CSI}48;2;{r};{g};{b}m{CSI}38;2;{or};{og};{ob}m{UNDERLINE}{:pad$}{RIGHT_EDGE}{SGR_RESET}",
                    "",
                    pad = COLUMNS_PER_CELL as usize - 1
                );
            }
            None => {
                let _ = write!(
                    self.pending,
                    "{CSI}{row};{col}H{CSI}48;2;{r};{g};{b}m{:width$}{SGR_RESET}",
                    "",
                    width = COLUMNS_PER_CELL as usize
                );
            }
        }
    }
}

impl<W: Write> DisplaySurface for ConsoleSurface<W> {
    fn draw_cell(&mut self, bounds: PixelRect, color: Color) -> Result<()> {
        let Some(cell) = self
            .layout
            .grid
            .cell_at(bounds.x1 as i64, bounds.y1 as i64)
        else {
            anyhow::bail!("ConsoleSurface: {:?} lies outside the grid", bounds);
        };
        trace!("ConsoleSurface: draw_cell ({}, {})", cell.x, cell.y);
        self.queue_cell(cell.x, cell.y, color);
        Ok(())
    }

    fn clear_all(&mut self, color: Color) -> Result<()> {
        debug!("ConsoleSurface: clear_all");
        let n = self.layout.grid.dimension();
        for y in 0..n {
            for x in 0..n {
                self.queue_cell(x, y, color);
            }
        }
        Ok(())
    }

    fn show_prediction(&mut self, lines: &[String]) -> Result<()> {
        let first_row = self.layout.prediction_row();
        let col = self.layout.origin_col;
        let rows = lines.len().max(self.shown_prediction_lines);
        for offset in 0..rows {
            let row = first_row + offset as u16;
            let text = lines.get(offset).map(String::as_str).unwrap_or("");
            let _ = write!(self.pending, "{CSI}{row};{col}H{ERASE_LINE}{text}");
        }
        self.shown_prediction_lines = lines.len();
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        self.out
            .write_all(self.pending.as_bytes())
            .context("ConsoleSurface: Failed to write frame")?;
        self.out
            .flush()
            .context("ConsoleSurface: Failed to flush output")?;
        self.pending.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::NamedColor;

    fn surface() -> ConsoleSurface<Vec<u8>> {
        ConsoleSurface::new(Vec::new(), ConsoleLayout::new(Grid::new(28, 10)))
    }

    #[test]
    fn terminal_positions_round_trip_to_cells() {
        let layout = ConsoleLayout::new(Grid::new(28, 10));
        for (x, y) in [(0usize, 0usize), (1, 1), (27, 27), (13, 4)] {
            let (row, col) = layout.cell_position(x, y);
            for extra in 0..COLUMNS_PER_CELL {
                let (px, py) = layout.terminal_to_pixel(col + extra, row);
                assert_eq!(layout.grid.pixel_to_cell(px, py), (x as i64, y as i64));
            }
        }
    }

    #[test]
    fn positions_outside_the_grid_map_off_grid() {
        let layout = ConsoleLayout::new(Grid::new(28, 10));
        let (px, py) = layout.terminal_to_pixel(1, 1);
        assert_eq!(layout.grid.cell_at(px, py), None);
        let (px, py) = layout.terminal_to_pixel(3 + 56, 2);
        assert_eq!(layout.grid.cell_at(px, py), None);
    }

    #[test]
    fn nothing_is_written_before_present() {
        let mut surface = surface();
        let bounds = Grid::new(28, 10).cell_bounds(1, 1).unwrap();
        surface
            .draw_cell(bounds, Color::Named(NamedColor::Black))
            .unwrap();
        assert!(surface.out.is_empty());
        surface.present().unwrap();
        let text = String::from_utf8(surface.into_inner()).unwrap();
        assert!(text.contains("\x1b[3;5H\x1b[48;2;0;0;0m  \x1b[0m"));
    }

    #[test]
    fn outlined_cells_carry_the_grid_lines() {
        let mut surface = surface().with_outline(Some(Color::Named(NamedColor::Gray)));
        let bounds = Grid::new(28, 10).cell_bounds(0, 0).unwrap();
        surface
            .draw_cell(bounds, Color::Named(NamedColor::White))
            .unwrap();
        surface.present().unwrap();
        let text = String::from_utf8(surface.into_inner()).unwrap();
        assert!(text.contains(
            "\x1b[2;3H\x1b[48;2;255;255;255m\x1b[38;2;127;127;127m\x1b[4m \u{2595}\x1b[0m"
        ));
    }

    #[test]
    fn shorter_predictions_erase_stale_lines() {
        let mut surface = surface();
        let long: Vec<String> = (0..10).map(|d| format!("{d}: 10.00%")).collect();
        surface.show_prediction(&long).unwrap();
        surface.present().unwrap();
        surface.out.clear();

        surface
            .show_prediction(&["Predicted: 7 (95.00%)".to_string()])
            .unwrap();
        surface.present().unwrap();
        let text = String::from_utf8(surface.into_inner()).unwrap();
        assert!(text.contains("Predicted: 7 (95.00%)"));
        assert_eq!(text.matches(ERASE_LINE).count(), 10);
    }
}
