// src/lib.rs

//! Freehand digit input surface.
//!
//! The user draws on an `N×N` grid with a brush; at a fixed cadence the grid
//! is snapshotted, normalized and handed to a classifier, and the answer is
//! rendered next to the drawing.

pub mod brush;
pub mod classifier;
pub mod color;
pub mod config;
pub mod display;
pub mod grid;
pub mod input;
pub mod orchestrator;
pub mod prediction;
pub mod raster;
pub mod session;
pub mod waker;
