// src/prediction/prediction_loop.rs

//! Per-tick prediction state machine.
//!
//! Each tick walks `Idle → Capturing → Inferring → Rendering → Idle`:
//! snapshot the raster buffer, normalize it, hand it to the inference worker,
//! validate whatever comes back and render it. Failures render an error
//! indicator and leave the loop ready for the next tick.
//!
//! With `TickPolicy::SkipWhileBusy` the tick returns as soon as the job is
//! queued and the reply is rendered from `on_inference_ready`; ticks that
//! arrive while a job is in flight are skipped. With `TickPolicy::Sequential`
//! the tick blocks on the reply. Either way a reply that misses the timeout is
//! reported as a failure and, if it shows up later, discarded. No new job is
//! queued while the worker is still running an abandoned one.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::time::{Duration, Instant};

use anyhow::Result;
use log::*;

use crate::classifier::Classifier;
use crate::config::{Config, TickPolicy};
use crate::display::DisplaySurface;
use crate::prediction::render::ResultRenderer;
use crate::prediction::worker::{InferenceJob, InferenceReply, InferenceWorker};
use crate::prediction::{InferenceFailure, PredictionResult};
use crate::session::Session;
use crate::waker::EventLoopWaker;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Capturing,
    Inferring,
    Rendering,
}

/// What a call to `on_tick` did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// An inference was still in flight; nothing was captured.
    Skipped,
    /// A job was queued; its reply arrives through `on_inference_ready`.
    Dispatched,
    /// The tick ran to completion and rendered this outcome.
    Completed(Result<PredictionResult, InferenceFailure>),
}

/// Counters over the lifetime of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub skipped: u64,
    pub completed: u64,
    pub failed: u64,
    pub discarded_replies: u64,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    tick: u64,
    started: Instant,
}

pub struct PredictionLoop {
    state: LoopState,
    policy: TickPolicy,
    timeout: Duration,
    num_classes: usize,
    renderer: ResultRenderer,
    worker: InferenceWorker,
    reply_rx: Receiver<InferenceReply>,
    in_flight: Option<InFlight>,
    last_tick: u64,
    last_outcome: Option<Result<PredictionResult, InferenceFailure>>,
    stats: LoopStats,
}

impl PredictionLoop {
    pub fn new(
        config: &Config,
        classifier: Arc<dyn Classifier>,
        waker: Box<dyn EventLoopWaker>,
    ) -> Result<Self> {
        let (reply_tx, reply_rx) = mpsc::channel();
        let worker = InferenceWorker::spawn(classifier, reply_tx, waker)?;
        Ok(Self {
            state: LoopState::Idle,
            policy: config.tick_policy,
            timeout: config.inference_timeout(),
            num_classes: config.num_classes,
            renderer: ResultRenderer::new(config.display_mode, config.num_classes),
            worker,
            reply_rx,
            in_flight: None,
            last_tick: 0,
            last_outcome: None,
            stats: LoopStats::default(),
        })
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn renderer(&self) -> &ResultRenderer {
        &self.renderer
    }

    /// The most recently rendered outcome.
    pub fn last_outcome(&self) -> Option<&Result<PredictionResult, InferenceFailure>> {
        self.last_outcome.as_ref()
    }

    pub fn is_inference_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Runs one tick against the current session contents.
    pub fn on_tick<S: DisplaySurface + ?Sized>(
        &mut self,
        session: &Session,
        surface: &mut S,
    ) -> Result<TickOutcome> {
        self.stats.ticks += 1;
        self.drain_replies(surface)?;
        self.expire_overdue(surface)?;

        if let Some(in_flight) = self.in_flight {
            self.stats.skipped += 1;
            debug!(
                "PredictionLoop: Tick skipped, tick {} still in flight",
                in_flight.tick
            );
            return Ok(TickOutcome::Skipped);
        }
        // A timed-out call may still occupy the worker. Queueing behind it
        // would only run jobs whose replies get discarded.
        if self.worker.is_busy() {
            self.stats.skipped += 1;
            debug!(
                "PredictionLoop: Tick skipped, worker still busy with {} abandoned job(s)",
                self.worker.outstanding_jobs()
            );
            return Ok(TickOutcome::Skipped);
        }

        self.state = LoopState::Capturing;
        let tensor = session.snapshot().to_normalized_tensor();

        self.last_tick += 1;
        let tick = self.last_tick;
        self.state = LoopState::Inferring;
        if let Err(e) = self.worker.submit(InferenceJob { tick, tensor }) {
            error!("PredictionLoop: {:#}", e);
            let outcome = Err(InferenceFailure::WorkerUnavailable);
            self.render(outcome.clone(), surface)?;
            return Ok(TickOutcome::Completed(outcome));
        }
        self.in_flight = Some(InFlight {
            tick,
            started: Instant::now(),
        });
        trace!("PredictionLoop: Dispatched tick {}", tick);

        match self.policy {
            TickPolicy::SkipWhileBusy => Ok(TickOutcome::Dispatched),
            TickPolicy::Sequential => self.wait_for_reply(surface),
        }
    }

    /// Picks up finished inferences. Call when the worker wakes the event loop.
    pub fn on_inference_ready<S: DisplaySurface + ?Sized>(&mut self, surface: &mut S) -> Result<()> {
        self.drain_replies(surface)?;
        self.expire_overdue(surface)
    }

    /// Stops the worker. Pending results are dropped.
    pub fn shutdown(&mut self) {
        info!(
            "PredictionLoop: Shutting down after {} ticks ({} skipped, {} completed, {} failed)",
            self.stats.ticks, self.stats.skipped, self.stats.completed, self.stats.failed
        );
        self.in_flight = None;
        self.state = LoopState::Idle;
        self.worker.shutdown();
    }

    fn wait_for_reply<S: DisplaySurface + ?Sized>(&mut self, surface: &mut S) -> Result<TickOutcome> {
        while let Some(in_flight) = self.in_flight {
            let deadline = in_flight.started + self.timeout;
            let wait = deadline.saturating_duration_since(Instant::now());
            match self.reply_rx.recv_timeout(wait) {
                Ok(reply) => self.handle_reply(reply, surface)?,
                Err(RecvTimeoutError::Timeout) => self.expire_overdue(surface)?,
                Err(RecvTimeoutError::Disconnected) => {
                    self.in_flight = None;
                    self.render(Err(InferenceFailure::WorkerUnavailable), surface)?;
                }
            }
        }
        Ok(match &self.last_outcome {
            Some(outcome) => TickOutcome::Completed(outcome.clone()),
            None => TickOutcome::Completed(Err(InferenceFailure::WorkerUnavailable)),
        })
    }

    fn drain_replies<S: DisplaySurface + ?Sized>(&mut self, surface: &mut S) -> Result<()> {
        loop {
            match self.reply_rx.try_recv() {
                Ok(reply) => self.handle_reply(reply, surface)?,
                Err(TryRecvError::Empty) => return Ok(()),
                Err(TryRecvError::Disconnected) => {
                    if self.in_flight.take().is_some() {
                        self.render(Err(InferenceFailure::WorkerUnavailable), surface)?;
                    }
                    return Ok(());
                }
            }
        }
    }

    fn expire_overdue<S: DisplaySurface + ?Sized>(&mut self, surface: &mut S) -> Result<()> {
        if let Some(in_flight) = self.in_flight {
            if in_flight.started.elapsed() >= self.timeout {
                warn!(
                    "PredictionLoop: Tick {} timed out after {:?}",
                    in_flight.tick, self.timeout
                );
                self.in_flight = None;
                self.render(Err(InferenceFailure::TimedOut(self.timeout)), surface)?;
            }
        }
        Ok(())
    }

    fn handle_reply<S: DisplaySurface + ?Sized>(
        &mut self,
        reply: InferenceReply,
        surface: &mut S,
    ) -> Result<()> {
        match self.in_flight {
            Some(in_flight) if in_flight.tick == reply.tick => {
                self.in_flight = None;
            }
            _ => {
                self.stats.discarded_replies += 1;
                debug!(
                    "PredictionLoop: Discarding stale reply for tick {} ({:?})",
                    reply.tick, reply.elapsed
                );
                return Ok(());
            }
        }

        let outcome = match reply.output {
            Ok(distribution) => PredictionResult::from_distribution(distribution, self.num_classes),
            Err(message) => Err(InferenceFailure::Classifier(message)),
        };
        self.render(outcome, surface)
    }

    fn render<S: DisplaySurface + ?Sized>(
        &mut self,
        outcome: Result<PredictionResult, InferenceFailure>,
        surface: &mut S,
    ) -> Result<()> {
        self.state = LoopState::Rendering;
        match &outcome {
            Ok(result) => {
                self.stats.completed += 1;
                trace!(
                    "PredictionLoop: Predicted {} ({:.4})",
                    result.class(),
                    result.confidence()
                );
            }
            Err(failure) => {
                self.stats.failed += 1;
                warn!("PredictionLoop: Inference failed: {}", failure);
            }
        }
        let lines = self.renderer.render(&outcome);
        self.last_outcome = Some(outcome);
        let shown = surface
            .show_prediction(&lines)
            .and_then(|_| surface.present());
        self.state = if self.in_flight.is_some() {
            LoopState::Inferring
        } else {
            LoopState::Idle
        };
        shown
    }
}

impl Drop for PredictionLoop {
    fn drop(&mut self) {
        self.worker.shutdown();
    }
}

#[cfg(test)]
mod tests;
