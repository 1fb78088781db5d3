// src/input/sgr.rs

//! Incremental decoder for terminal input bytes.
//!
//! Recognizes xterm SGR (1006) mouse reports, `ESC [ < Cb ; Cx ; Cy M|m`, and
//! passes every other byte outside an escape sequence through as a key byte.
//! Escape sequences that are not mouse reports (arrow keys and the like) are
//! consumed and dropped. State is kept across calls, so a report split
//! between two reads decodes correctly.

use log::{trace, warn};

use crate::display::console::ConsoleLayout;
use crate::input::{KeyCommand, Modifiers, PointerButton, PointerEvent, PointerPhase};

const ESC: u8 = 0x1B;
const CTRL_C: u8 = 0x03;
const CSI_FINAL_BYTES: std::ops::RangeInclusive<u8> = 0x40..=0x7E;

// Bits of the SGR button code.
const BUTTON_MASK: u16 = 0b11;
const SHIFT_BIT: u16 = 4;
const META_BIT: u16 = 8;
const CONTROL_BIT: u16 = 16;
const MOTION_BIT: u16 = 32;
const WHEEL_BIT: u16 = 64;

/// A decoded mouse report. Positions are 1-based terminal cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseReport {
    pub code: u16,
    pub col: u16,
    pub row: u16,
    pub release: bool,
}

impl MouseReport {
    /// Converts the report into a pointer event in surface pixels.
    ///
    /// Wheel events and motion with no button held produce nothing.
    pub fn to_pointer_event(&self, layout: &ConsoleLayout) -> Option<PointerEvent> {
        if self.code & WHEEL_BIT != 0 {
            return None;
        }
        let button = match self.code & BUTTON_MASK {
            0 => PointerButton::Primary,
            1 => PointerButton::Middle,
            2 => PointerButton::Secondary,
            _ => return None,
        };
        let phase = if self.release {
            PointerPhase::Release
        } else if self.code & MOTION_BIT != 0 {
            PointerPhase::Drag
        } else {
            PointerPhase::Press
        };
        let mut modifiers = Modifiers::empty();
        modifiers.set(Modifiers::SHIFT, self.code & SHIFT_BIT != 0);
        modifiers.set(Modifiers::ALT, self.code & META_BIT != 0);
        modifiers.set(Modifiers::CONTROL, self.code & CONTROL_BIT != 0);

        let (x, y) = layout.terminal_to_pixel(self.col, self.row);
        Some(PointerEvent {
            button,
            phase,
            x,
            y,
            modifiers,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputToken {
    Mouse(MouseReport),
    Byte(u8),
}

impl InputToken {
    /// Key command for a plain byte: `q` or Ctrl-C quit, `c` clears.
    pub fn key_command(&self) -> Option<KeyCommand> {
        match self {
            InputToken::Byte(b'q') | InputToken::Byte(b'Q') | InputToken::Byte(CTRL_C) => {
                Some(KeyCommand::Quit)
            }
            InputToken::Byte(b'c') | InputToken::Byte(b'C') => Some(KeyCommand::Clear),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum State {
    #[default]
    Ground,
    Escape,
    Csi,
    SgrMouse {
        params: Vec<u16>,
        current: Option<u16>,
    },
}

#[derive(Debug, Default)]
pub struct SgrParser {
    state: State,
}

impl SgrParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds bytes, returning every complete token.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<InputToken> {
        let mut tokens = Vec::new();
        for &byte in bytes {
            if let Some(token) = self.advance(byte) {
                tokens.push(token);
            }
        }
        tokens
    }

    fn advance(&mut self, byte: u8) -> Option<InputToken> {
        match std::mem::take(&mut self.state) {
            State::Ground => {
                if byte == ESC {
                    self.state = State::Escape;
                    None
                } else {
                    Some(InputToken::Byte(byte))
                }
            }
            State::Escape => {
                if byte == b'[' {
                    self.state = State::Csi;
                }
                // ESC followed by anything else is an Alt-modified key; drop it.
                None
            }
            State::Csi => {
                if byte == b'<' {
                    self.state = State::SgrMouse {
                        params: Vec::with_capacity(3),
                        current: None,
                    };
                } else if !CSI_FINAL_BYTES.contains(&byte) {
                    self.state = State::Csi;
                } else {
                    trace!("SgrParser: dropping CSI sequence ending in {:?}", byte as char);
                }
                None
            }
            State::SgrMouse {
                mut params,
                mut current,
            } => match byte {
                b'0'..=b'9' => {
                    let digit = (byte - b'0') as u16;
                    current = Some(current.unwrap_or(0).saturating_mul(10).saturating_add(digit));
                    self.state = State::SgrMouse { params, current };
                    None
                }
                b';' => {
                    params.push(current.unwrap_or(0));
                    self.state = State::SgrMouse {
                        params,
                        current: None,
                    };
                    None
                }
                b'M' | b'm' => {
                    params.push(current.unwrap_or(0));
                    if let [code, col, row] = params[..] {
                        Some(InputToken::Mouse(MouseReport {
                            code,
                            col,
                            row,
                            release: byte == b'm',
                        }))
                    } else {
                        warn!("SgrParser: malformed mouse report {:?}", params);
                        None
                    }
                }
                _ => {
                    warn!("SgrParser: unexpected byte {:#04x} in mouse report", byte);
                    None
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    #[test]
    fn decodes_press_drag_and_release() {
        let mut parser = SgrParser::new();
        let tokens = parser.feed(b"\x1b[<0;5;3M\x1b[<32;7;3M\x1b[<0;7;3m");
        assert_eq!(
            tokens,
            vec![
                InputToken::Mouse(MouseReport { code: 0, col: 5, row: 3, release: false }),
                InputToken::Mouse(MouseReport { code: 32, col: 7, row: 3, release: false }),
                InputToken::Mouse(MouseReport { code: 0, col: 7, row: 3, release: true }),
            ]
        );
    }

    #[test]
    fn reports_split_across_reads_are_reassembled() {
        let mut parser = SgrParser::new();
        assert!(parser.feed(b"\x1b[<2;1").is_empty());
        assert_eq!(
            parser.feed(b"0;4M"),
            vec![InputToken::Mouse(MouseReport { code: 2, col: 10, row: 4, release: false })]
        );
    }

    #[test]
    fn keys_pass_through_and_other_sequences_are_dropped() {
        let mut parser = SgrParser::new();
        let tokens = parser.feed(b"c\x1b[Aq");
        assert_eq!(tokens, vec![InputToken::Byte(b'c'), InputToken::Byte(b'q')]);
        assert_eq!(tokens[0].key_command(), Some(KeyCommand::Clear));
        assert_eq!(tokens[1].key_command(), Some(KeyCommand::Quit));
        assert_eq!(InputToken::Byte(0x03).key_command(), Some(KeyCommand::Quit));
        assert_eq!(InputToken::Byte(b'x').key_command(), None);
    }

    #[test]
    fn reports_map_to_pointer_events() {
        let layout = ConsoleLayout::new(Grid::new(28, 10));
        let press = MouseReport { code: 0, col: 5, row: 3, release: false };
        let event = press.to_pointer_event(&layout).unwrap();
        assert_eq!(event.button, PointerButton::Primary);
        assert_eq!(event.phase, PointerPhase::Press);
        assert_eq!(layout.grid.pixel_to_cell(event.x, event.y), (1, 1));

        let drag = MouseReport { code: 32 + 2 + 16, col: 5, row: 3, release: false };
        let event = drag.to_pointer_event(&layout).unwrap();
        assert_eq!(event.button, PointerButton::Secondary);
        assert_eq!(event.phase, PointerPhase::Drag);
        assert!(event.modifiers.contains(Modifiers::CONTROL));

        let wheel = MouseReport { code: 64, col: 5, row: 3, release: false };
        assert_eq!(wheel.to_pointer_event(&layout), None);
        let hover = MouseReport { code: 35, col: 5, row: 3, release: false };
        assert_eq!(hover.to_pointer_event(&layout), None);
    }
}
