// src/display/terminal.rs

//! Raw-mode terminal session with mouse reporting.
//!
//! `RawTerminal` switches stdin to raw mode, enters the alternate screen,
//! hides the cursor and enables xterm button-event mouse tracking with SGR
//! (1006) coordinates. Everything is undone on drop.

use std::io::{stdout, Write};
use std::mem;
use std::os::unix::io::RawFd;

use anyhow::{Context, Result};
use libc::{winsize, STDIN_FILENO, TIOCGWINSZ};
use log::{debug, error, info, warn};
use termios::{tcsetattr, Termios, ECHO, ICANON, ISIG, TCSANOW, VMIN, VTIME};

const ENTER_ALT_SCREEN: &str = "\x1b[?1049h";
const LEAVE_ALT_SCREEN: &str = "\x1b[?1049l";
const CURSOR_HIDE: &str = "\x1b[?25l";
const CURSOR_SHOW: &str = "\x1b[?25h";
const CLEAR_SCREEN_AND_HOME: &str = "\x1b[2J\x1b[H";
// Button-event tracking reports presses, releases and motion while a button is held.
const MOUSE_TRACKING_ON: &str = "\x1b[?1002h\x1b[?1006h";
const MOUSE_TRACKING_OFF: &str = "\x1b[?1006l\x1b[?1002l";

// Raw reads return after at most VTIME deciseconds so the reader can notice shutdown.
const READ_TIMEOUT_DECISECONDS: u8 = 1;

const DEFAULT_WINDOW_WIDTH_CHARS: u16 = 80;
const DEFAULT_WINDOW_HEIGHT_CHARS: u16 = 24;

/// Guard for the raw terminal session.
pub struct RawTerminal {
    original_termios: Option<Termios>,
}

impl RawTerminal {
    pub fn enter() -> Result<Self> {
        info!("RawTerminal: Entering raw mode.");
        let original_termios = match Termios::from_fd(STDIN_FILENO) {
            Ok(ts) => Some(ts),
            Err(e) => {
                warn!(
                    "RawTerminal: Failed to get initial termios: {}. Proceeding without raw mode.",
                    e
                );
                None
            }
        };

        if let Some(ref ots) = original_termios {
            let mut raw_termios = *ots;
            raw_termios.c_lflag &= !(ECHO | ICANON | ISIG);
            raw_termios.c_iflag &=
                !(libc::IXON | libc::IXOFF | libc::ICRNL | libc::INLCR | libc::IGNCR);
            raw_termios.c_cc[VMIN] = 0;
            raw_termios.c_cc[VTIME] = READ_TIMEOUT_DECISECONDS;
            tcsetattr(STDIN_FILENO, TCSANOW, &raw_termios)
                .context("RawTerminal: Failed to set raw terminal attributes")?;
            debug!("RawTerminal: Terminal set to raw mode.");
        }

        let mut out = stdout();
        write!(
            out,
            "{ENTER_ALT_SCREEN}{CURSOR_HIDE}{CLEAR_SCREEN_AND_HOME}{MOUSE_TRACKING_ON}"
        )
        .and_then(|_| out.flush())
        .context("RawTerminal: Failed to configure terminal")?;

        Ok(Self { original_termios })
    }

    fn restore(&mut self) -> Result<()> {
        let mut out = stdout();
        write!(
            out,
            "{MOUSE_TRACKING_OFF}{CURSOR_SHOW}{LEAVE_ALT_SCREEN}"
        )
        .and_then(|_| out.flush())
        .context("RawTerminal: Failed to reset terminal output")?;
        if let Some(ots) = self.original_termios.take() {
            tcsetattr(STDIN_FILENO, TCSANOW, &ots)
                .context("RawTerminal: Failed to restore terminal attributes")?;
        }
        Ok(())
    }
}

impl Drop for RawTerminal {
    fn drop(&mut self) {
        info!("RawTerminal: Restoring terminal.");
        if let Err(e) = self.restore() {
            error!("RawTerminal: Error during cleanup in drop: {:#}", e);
        }
    }
}

/// Terminal size as (columns, rows).
pub fn terminal_size_cells(fd: RawFd) -> Result<(u16, u16)> {
    unsafe {
        let mut winsz: winsize = mem::zeroed();
        if libc::ioctl(fd, TIOCGWINSZ, &mut winsz) == -1 {
            return Err(anyhow::Error::from(std::io::Error::last_os_error())
                .context("ioctl(TIOCGWINSZ) failed"));
        }
        let cols = if winsz.ws_col == 0 {
            DEFAULT_WINDOW_WIDTH_CHARS
        } else {
            winsz.ws_col
        };
        let rows = if winsz.ws_row == 0 {
            DEFAULT_WINDOW_HEIGHT_CHARS
        } else {
            winsz.ws_row
        };
        Ok((cols, rows))
    }
}

/// Size of stdin's terminal.
pub fn stdin_size_cells() -> Result<(u16, u16)> {
    terminal_size_cells(STDIN_FILENO)
}
