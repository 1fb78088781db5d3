// src/orchestrator/mod.rs

//! Orchestrates the drawing session.
//!
//! The orchestrator is the only writer of the session. Pointer input, key
//! commands, ticker ticks and inference wake-ups all arrive on one channel and
//! are handled in order on the orchestrator thread, so a tick's snapshot
//! always sees whole brush stamps.

pub mod orchestrator_channel;

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::*;

use crate::brush::BrushEngine;
use crate::classifier::Classifier;
use crate::config::Config;
use crate::display::DisplaySurface;
use crate::input::{InputDispatcher, KeyCommand};
use crate::prediction::{PredictionLoop, TickOutcome};
use crate::session::Session;
use crate::waker::EventLoopWaker;

pub use orchestrator_channel::{
    create_orchestrator_channel, ChannelWaker, ControlEvent, OrchestratorSender, TickGate,
};

/// How long `run` blocks before checking for an overdue inference.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Status of the orchestrator after processing an event.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum OrchestratorStatus {
    /// Keep processing events.
    Running,
    /// A quit was requested or every sender went away.
    Shutdown,
}

pub struct Orchestrator<S: DisplaySurface> {
    session: Session,
    brush: BrushEngine,
    dispatcher: InputDispatcher,
    prediction_loop: PredictionLoop,
    surface: S,
    tick_gate: TickGate,
}

impl<S: DisplaySurface> Orchestrator<S> {
    /// Builds the orchestrator and starts the inference worker. `waker` is
    /// called by the worker whenever a reply is ready.
    pub fn new(
        config: &Config,
        session: Session,
        surface: S,
        waker: Box<dyn EventLoopWaker>,
    ) -> Result<Self> {
        let classifier: Arc<dyn Classifier> = session.classifier();
        let prediction_loop = PredictionLoop::new(config, classifier, waker)
            .context("Failed to start prediction loop")?;
        Ok(Self {
            session,
            brush: BrushEngine::from_config(config),
            dispatcher: InputDispatcher::for_erase_mode(config.erase_mode),
            prediction_loop,
            surface,
            tick_gate: TickGate::new(),
        })
    }

    /// Paints the blank grid.
    pub fn initialize(&mut self) -> Result<()> {
        info!(
            "Orchestrator: Initializing {}x{} grid ({} px cells)",
            self.session.grid().dimension(),
            self.session.grid().dimension(),
            self.session.grid().pixel_size()
        );
        self.brush.clear(&mut self.session, &mut self.surface)
    }

    /// Handles one event.
    pub fn process_event(&mut self, event: ControlEvent) -> Result<OrchestratorStatus> {
        match event {
            ControlEvent::Pointer(pointer) => {
                let action = self.dispatcher.dispatch(
                    &pointer,
                    &self.brush,
                    &mut self.session,
                    &mut self.surface,
                )?;
                trace!("Orchestrator: {:?} -> {:?}", pointer, action);
            }
            ControlEvent::Key(KeyCommand::Clear) => {
                debug!("Orchestrator: Clear requested");
                self.brush.clear(&mut self.session, &mut self.surface)?;
            }
            ControlEvent::Key(KeyCommand::Quit) | ControlEvent::Shutdown => {
                info!("Orchestrator: Shutdown requested");
                return Ok(OrchestratorStatus::Shutdown);
            }
            ControlEvent::Tick(number) => {
                let outcome = self
                    .prediction_loop
                    .on_tick(&self.session, &mut self.surface);
                self.tick_gate.release();
                if outcome? == TickOutcome::Skipped {
                    trace!("Orchestrator: Tick {} skipped", number);
                }
            }
            ControlEvent::InferenceReady => {
                self.prediction_loop.on_inference_ready(&mut self.surface)?;
            }
        }
        Ok(OrchestratorStatus::Running)
    }

    /// Processes events until shutdown. While idle, overdue inferences are
    /// still expired so a hung classifier shows up as an error.
    pub fn run(&mut self, events: &Receiver<ControlEvent>) -> Result<()> {
        loop {
            let status = match events.recv_timeout(IDLE_POLL_INTERVAL) {
                Ok(event) => self.process_event(event)?,
                Err(RecvTimeoutError::Timeout) => {
                    self.prediction_loop.on_inference_ready(&mut self.surface)?;
                    OrchestratorStatus::Running
                }
                Err(RecvTimeoutError::Disconnected) => {
                    info!("Orchestrator: All senders gone");
                    OrchestratorStatus::Shutdown
                }
            };
            if status == OrchestratorStatus::Shutdown {
                return Ok(());
            }
        }
    }

    /// Gate to share with the ticker, see `TickGate::forwarder`.
    pub fn tick_gate(&self) -> TickGate {
        self.tick_gate.clone()
    }

    /// Stops the inference worker.
    pub fn shutdown(&mut self) {
        self.prediction_loop.shutdown();
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn prediction_loop(&self) -> &PredictionLoop {
        &self.prediction_loop
    }

    pub fn into_surface(mut self) -> S {
        self.prediction_loop.shutdown();
        self.surface
    }
}

#[cfg(test)]
mod tests;
