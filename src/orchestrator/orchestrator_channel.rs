// src/orchestrator/orchestrator_channel.rs
//!
//! Unified event channel for the orchestrator.
//!
//! Input, ticker and inference worker all feed the same queue, so the
//! orchestrator handles them one at a time in arrival order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SendError, Sender};
use std::sync::Arc;

use anyhow::Result;
use log::trace;

use crate::input::{KeyCommand, PointerEvent};
use crate::waker::EventLoopWaker;

/// All event types that the orchestrator can receive.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    /// Pointer input in surface pixels.
    Pointer(PointerEvent),
    /// Keyboard command.
    Key(KeyCommand),
    /// The ticker fired; carries the tick number.
    Tick(u64),
    /// The inference worker has a reply waiting.
    InferenceReady,
    /// Stop the session.
    Shutdown,
}

impl From<PointerEvent> for ControlEvent {
    fn from(event: PointerEvent) -> Self {
        ControlEvent::Pointer(event)
    }
}

impl From<KeyCommand> for ControlEvent {
    fn from(command: KeyCommand) -> Self {
        ControlEvent::Key(command)
    }
}

/// Cloneable handle for sending events to the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorSender {
    tx: Sender<ControlEvent>,
}

impl OrchestratorSender {
    /// Sends anything convertible into a `ControlEvent`.
    pub fn send<T>(&self, msg: T) -> Result<(), SendError<ControlEvent>>
    where
        ControlEvent: From<T>,
    {
        self.tx.send(ControlEvent::from(msg))
    }
}

/// Creates the orchestrator channel.
pub fn create_orchestrator_channel() -> (OrchestratorSender, Receiver<ControlEvent>) {
    let (tx, rx) = mpsc::channel();
    (OrchestratorSender { tx }, rx)
}

/// Wakes the orchestrator by queueing `ControlEvent::InferenceReady`.
pub struct ChannelWaker {
    sender: OrchestratorSender,
}

impl ChannelWaker {
    pub fn new(sender: OrchestratorSender) -> Self {
        Self { sender }
    }
}

impl EventLoopWaker for ChannelWaker {
    fn wake(&self) -> Result<()> {
        self.sender
            .send(ControlEvent::InferenceReady)
            .map_err(|_| anyhow::anyhow!("Orchestrator channel closed"))
    }
}

/// Keeps at most one `ControlEvent::Tick` queued for the orchestrator.
///
/// The ticker arms the gate when it queues a tick and the orchestrator
/// releases it once the tick has been handled. Ticks that fire while the gate
/// is armed are dropped, so a slow tick never builds a backlog ahead of
/// pointer input.
#[derive(Debug, Clone, Default)]
pub struct TickGate {
    pending: Arc<AtomicBool>,
}

impl TickGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the gate. Returns `false` if a tick is already pending.
    pub fn try_arm(&self) -> bool {
        !self.pending.swap(true, Ordering::SeqCst)
    }

    /// Marks the pending tick as handled.
    pub fn release(&self) {
        self.pending.store(false, Ordering::SeqCst);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    /// Ticker callback that forwards ticks through the gate. Returns `false`
    /// once the orchestrator channel is closed, which stops the ticker.
    pub fn forwarder(
        self,
        sender: OrchestratorSender,
    ) -> impl FnMut(u64) -> bool + Send + 'static {
        move |tick| {
            if !self.try_arm() {
                trace!("TickGate: Dropping tick {}, previous tick still pending", tick);
                return true;
            }
            sender.send(ControlEvent::Tick(tick)).is_ok()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn gate_forwards_one_tick_until_released() {
        let (tx, rx) = create_orchestrator_channel();
        let gate = TickGate::new();
        let mut forward = gate.clone().forwarder(tx);

        assert!(forward(1));
        assert!(forward(2));
        assert!(forward(3));
        assert!(gate.is_pending());
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![ControlEvent::Tick(1)]);

        gate.release();
        assert!(forward(4));
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![ControlEvent::Tick(4)]);
    }

    #[test]
    fn forwarder_stops_the_ticker_once_the_channel_closes() {
        let (tx, rx) = create_orchestrator_channel();
        let mut forward = TickGate::new().forwarder(tx);
        drop(rx);
        assert!(!forward(1));
    }
}
