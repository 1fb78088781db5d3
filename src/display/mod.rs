// src/display/mod.rs

//! Display surfaces.
//!
//! A `DisplaySurface` is the only thing the brush and the prediction loop know
//! about the screen. It receives filled-cell commands in pixel space plus the
//! text lines of the latest prediction. Implementations:
//!
//! - `console::ConsoleSurface` draws into an ANSI terminal.
//! - `headless::HeadlessSurface` records commands and keeps a color model of
//!   the grid, for tests and for running without a terminal.

pub mod console;
pub mod headless;
pub mod terminal;

use crate::color::Color;
use crate::grid::PixelRect;
use anyhow::Result;

pub use console::ConsoleSurface;
pub use headless::{HeadlessSurface, SurfaceCommand};

/// Drawing primitives used by the brush and the prediction loop.
///
/// Commands may be buffered; `present()` makes everything issued so far
/// visible.
pub trait DisplaySurface {
    /// Fills one cell, given by its pixel box, with `color`.
    fn draw_cell(&mut self, bounds: PixelRect, color: Color) -> Result<()>;

    /// Repaints the whole drawing area with `color`.
    fn clear_all(&mut self, color: Color) -> Result<()>;

    /// Replaces the prediction text. One entry per output slot.
    fn show_prediction(&mut self, lines: &[String]) -> Result<()>;

    /// Flushes pending drawing commands.
    fn present(&mut self) -> Result<()>;
}

impl<S: DisplaySurface + ?Sized> DisplaySurface for Box<S> {
    fn draw_cell(&mut self, bounds: PixelRect, color: Color) -> Result<()> {
        (**self).draw_cell(bounds, color)
    }

    fn clear_all(&mut self, color: Color) -> Result<()> {
        (**self).clear_all(color)
    }

    fn show_prediction(&mut self, lines: &[String]) -> Result<()> {
        (**self).show_prediction(lines)
    }

    fn present(&mut self) -> Result<()> {
        (**self).present()
    }
}
