// src/waker.rs
//! EventLoopWaker - cross-thread signaling to wake the orchestrator.
//!
//! Background threads that finish work the orchestrator has to pick up (the
//! inference worker) call `wake()` so the orchestrator checks for it.

use anyhow::Result;

/// Trait for waking the orchestrator event loop from background threads.
pub trait EventLoopWaker: Send + Sync {
    /// Wake the event loop, causing it to look for pending work.
    fn wake(&self) -> Result<()>;
}

/// Waker that does nothing; for owners that poll on their own schedule.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpWaker;

impl EventLoopWaker for NoOpWaker {
    fn wake(&self) -> Result<()> {
        Ok(())
    }
}
