// src/input/reader.rs

//! Input reader thread.
//!
//! Reads raw bytes from the terminal, decodes them with `SgrParser` and
//! forwards pointer events and key commands to the orchestrator. On a raw
//! terminal reads time out every 100 ms (VTIME), which is when the stop flag
//! is checked. On any other source an empty read means end of input and is
//! reported as a quit.

use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use log::*;

use crate::display::console::ConsoleLayout;
use crate::input::sgr::{InputToken, SgrParser};
use crate::input::KeyCommand;
use crate::orchestrator::{ControlEvent, OrchestratorSender};

const READ_BUFFER_SIZE: usize = 256;

pub struct InputReader {
    stop_flag: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl InputReader {
    /// Spawns the reader.
    ///
    /// `empty_read_is_eof` must be `false` for a raw terminal with a read
    /// timeout, and `true` for pipes and files.
    pub fn spawn<R>(
        mut source: R,
        layout: ConsoleLayout,
        orchestrator_tx: OrchestratorSender,
        empty_read_is_eof: bool,
    ) -> Result<Self>
    where
        R: Read + Send + 'static,
    {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&stop_flag);

        let thread_handle = thread::Builder::new()
            .name("input".to_string())
            .spawn(move || {
                info!("InputReader: Started");
                let mut parser = SgrParser::new();
                let mut buffer = [0u8; READ_BUFFER_SIZE];
                while !stop.load(Ordering::SeqCst) {
                    let bytes_read = match source.read(&mut buffer) {
                        Ok(0) if empty_read_is_eof => {
                            info!("InputReader: End of input, requesting quit");
                            let _ = orchestrator_tx.send(ControlEvent::Key(KeyCommand::Quit));
                            break;
                        }
                        Ok(n) => n,
                        Err(ref e)
                            if e.kind() == io::ErrorKind::Interrupted
                                || e.kind() == io::ErrorKind::WouldBlock =>
                        {
                            continue;
                        }
                        Err(e) => {
                            error!("InputReader: Read failed: {}", e);
                            let _ = orchestrator_tx.send(ControlEvent::Key(KeyCommand::Quit));
                            break;
                        }
                    };

                    for token in parser.feed(&buffer[..bytes_read]) {
                        let event = match &token {
                            InputToken::Mouse(report) => {
                                report.to_pointer_event(&layout).map(ControlEvent::Pointer)
                            }
                            InputToken::Byte(_) => token.key_command().map(ControlEvent::Key),
                        };
                        let Some(event) = event else {
                            continue;
                        };
                        if orchestrator_tx.send(event).is_err() {
                            info!("InputReader: Orchestrator channel closed, exiting");
                            return;
                        }
                    }
                }
                debug!("InputReader: Thread exiting");
            })
            .context("Failed to spawn input reader thread")?;

        Ok(Self {
            stop_flag,
            thread_handle: Some(thread_handle),
        })
    }

    /// Asks the thread to stop and waits for it. Returns once the pending read
    /// times out or completes.
    pub fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                error!("InputReader thread panicked: {:?}", e);
            }
        }
    }
}

impl Drop for InputReader {
    fn drop(&mut self) {
        self.stop();
    }
}
