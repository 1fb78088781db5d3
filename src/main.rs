// src/main.rs

use std::io::stdin;
use std::path::PathBuf;

use anyhow::Context;
use log::{error, info, warn};

use digit_pad::{
    classifier,
    config::Config,
    display::{
        console::ConsoleLayout,
        terminal::{stdin_size_cells, RawTerminal},
        ConsoleSurface,
    },
    input::InputReader,
    orchestrator::{create_orchestrator_channel, ChannelWaker, Orchestrator},
    prediction::Ticker,
    session::Session,
};

const HEADER: &str =
    "Draw a digit: left button paints, right button or Ctrl-left erases, c clears, q quits";

/// Main entry point for `digit-pad`.
fn main() -> anyhow::Result<()> {
    // Default filter is "info" if RUST_LOG is not set.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    info!("Starting digit-pad...");

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = Config::load_or_default(config_path.as_deref())?;
    info!("Configuration: {:?}", config);

    // Without a model there is nothing to predict with.
    let classifier = classifier::load(&config.model_path, config.grid_size)?;
    let session = Session::from_config(&config, classifier);

    let layout = ConsoleLayout::new(*session.grid());
    let last = config.grid_size.saturating_sub(1);
    let (_, last_col) = layout.cell_position(last, last);
    let needed = (last_col + 1, layout.prediction_row() + config.num_classes as u16);
    match stdin_size_cells() {
        Ok((cols, rows)) if cols < needed.0 || rows < needed.1 => warn!(
            "Terminal is {}x{} cells; the full layout needs {}x{}",
            cols, rows, needed.0, needed.1
        ),
        Ok(_) => {}
        Err(e) => warn!("Could not query terminal size: {:#}", e),
    }

    // SAFETY: isatty only inspects the descriptor.
    let stdin_is_tty = unsafe { libc::isatty(libc::STDIN_FILENO) } == 1;
    let terminal = RawTerminal::enter().context("Failed to prepare terminal")?;

    let mut surface =
        ConsoleSurface::new(std::io::stdout(), layout).with_outline(config.colors.outline);
    surface.draw_header(HEADER);

    let (orchestrator_tx, orchestrator_rx) = create_orchestrator_channel();
    let mut orchestrator = Orchestrator::new(
        &config,
        session,
        surface,
        Box::new(ChannelWaker::new(orchestrator_tx.clone())),
    )?;
    orchestrator.initialize()?;

    let mut ticker = Ticker::spawn(
        config.tick_interval(),
        orchestrator.tick_gate().forwarder(orchestrator_tx.clone()),
    )?;
    let mut reader = InputReader::spawn(stdin(), layout, orchestrator_tx, !stdin_is_tty)?;

    let result = orchestrator.run(&orchestrator_rx);
    if let Err(ref e) = result {
        error!("Orchestrator failed: {:#}", e);
    }

    info!("Shutting down...");
    ticker.stop();
    orchestrator.shutdown();
    reader.stop();
    drop(terminal);

    info!("digit-pad exited.");
    result
}
