// src/input/mod.rs

//! Pointer and key input.
//!
//! Pointer events carry surface pixel coordinates, a button and a phase. The
//! `InputDispatcher` looks the `(button, phase)` pair up in a table to find the
//! brush operation, maps the pixel to a cell and applies the operation.
//! Positions off the grid are ignored. Ctrl held with the primary button
//! counts as the secondary button, for pointers that have only one.

pub mod reader;
pub mod sgr;

use std::collections::HashMap;

use anyhow::Result;
use bitflags::bitflags;
use log::trace;

use crate::brush::BrushEngine;
use crate::config::EraseMode;
use crate::display::DisplaySurface;
use crate::session::Session;

pub use reader::InputReader;
pub use sgr::{InputToken, SgrParser};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerPhase {
    Press,
    Drag,
    Release,
}

bitflags! {
    /// Modifier keys held during a pointer event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const ALT = 1 << 1;
        const CONTROL = 1 << 2;
    }
}

/// A pointer event in surface pixel coordinates. Coordinates may lie off the
/// surface, including negative values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    pub button: PointerButton,
    pub phase: PointerPhase,
    pub x: i64,
    pub y: i64,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    pub fn new(button: PointerButton, phase: PointerPhase, x: i64, y: i64) -> Self {
        Self {
            button,
            phase,
            x,
            y,
            modifiers: Modifiers::empty(),
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// The button used for dispatch: Ctrl-primary acts as secondary.
    pub fn effective_button(&self) -> PointerButton {
        if self.button == PointerButton::Primary && self.modifiers.contains(Modifiers::CONTROL) {
            PointerButton::Secondary
        } else {
            self.button
        }
    }
}

/// Keyboard commands understood by the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Clear,
    Quit,
}

/// Brush operation bound to a `(button, phase)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrushAction {
    Paint,
    Erase,
    Clear,
}

/// `(button, phase) → BrushAction` table.
#[derive(Debug, Clone)]
pub struct InputDispatcher {
    bindings: HashMap<(PointerButton, PointerPhase), BrushAction>,
}

impl InputDispatcher {
    /// Primary press/drag paints. The secondary button erases under the
    /// pointer in `Localized` mode and clears the drawing on press in
    /// `FullClear` mode.
    pub fn for_erase_mode(mode: EraseMode) -> Self {
        let mut bindings = HashMap::new();
        bindings.insert(
            (PointerButton::Primary, PointerPhase::Press),
            BrushAction::Paint,
        );
        bindings.insert(
            (PointerButton::Primary, PointerPhase::Drag),
            BrushAction::Paint,
        );
        match mode {
            EraseMode::Localized => {
                bindings.insert(
                    (PointerButton::Secondary, PointerPhase::Press),
                    BrushAction::Erase,
                );
                bindings.insert(
                    (PointerButton::Secondary, PointerPhase::Drag),
                    BrushAction::Erase,
                );
            }
            EraseMode::FullClear => {
                bindings.insert(
                    (PointerButton::Secondary, PointerPhase::Press),
                    BrushAction::Clear,
                );
            }
        }
        Self { bindings }
    }

    /// Adds or replaces one binding.
    pub fn bind(&mut self, button: PointerButton, phase: PointerPhase, action: BrushAction) {
        self.bindings.insert((button, phase), action);
    }

    pub fn action_for(&self, button: PointerButton, phase: PointerPhase) -> Option<BrushAction> {
        self.bindings.get(&(button, phase)).copied()
    }

    /// Applies the operation bound to `event`. Returns the action that ran, or
    /// `None` when the event is unbound or lands off the grid.
    pub fn dispatch<S: DisplaySurface + ?Sized>(
        &self,
        event: &PointerEvent,
        brush: &BrushEngine,
        session: &mut Session,
        surface: &mut S,
    ) -> Result<Option<BrushAction>> {
        let Some(action) = self.action_for(event.effective_button(), event.phase) else {
            return Ok(None);
        };
        match action {
            BrushAction::Clear => brush.clear(session, surface)?,
            BrushAction::Paint | BrushAction::Erase => {
                let Some(cell) = session.grid().cell_at(event.x, event.y) else {
                    trace!(
                        "InputDispatcher: ignoring {:?} at ({}, {}), off the grid",
                        action,
                        event.x,
                        event.y
                    );
                    return Ok(None);
                };
                if action == BrushAction::Paint {
                    brush.paint(session, surface, cell)?;
                } else {
                    brush.erase(session, surface, cell)?;
                }
            }
        }
        Ok(Some(action))
    }
}
