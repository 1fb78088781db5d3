// src/session.rs

//! The drawing session: grid, raster buffer and classifier handle, owned in one
//! place and passed to the components that need them.

use std::sync::Arc;

use crate::classifier::Classifier;
use crate::config::Config;
use crate::grid::Grid;
use crate::raster::{RasterBuffer, RasterSnapshot};

pub struct Session {
    grid: Grid,
    buffer: RasterBuffer,
    classifier: Arc<dyn Classifier>,
}

impl Session {
    pub fn new(grid: Grid, classifier: Arc<dyn Classifier>) -> Self {
        Self {
            grid,
            buffer: RasterBuffer::new(grid.dimension()),
            classifier,
        }
    }

    pub fn from_config(config: &Config, classifier: Arc<dyn Classifier>) -> Self {
        Self::new(Grid::new(config.grid_size, config.pixel_size), classifier)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn buffer(&self) -> &RasterBuffer {
        &self.buffer
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut RasterBuffer {
        &mut self.buffer
    }

    pub fn classifier(&self) -> Arc<dyn Classifier> {
        Arc::clone(&self.classifier)
    }

    pub fn snapshot(&self) -> RasterSnapshot {
        self.buffer.snapshot()
    }
}
