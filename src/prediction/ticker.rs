// src/prediction/ticker.rs

//! Cancellable repeating timer.
//!
//! The ticker runs in its own thread and invokes a callback once per interval
//! with a monotonically increasing tick number. Deadlines are computed from the
//! start time, so a slow callback does not accumulate drift; if the callback
//! overruns by whole intervals, the missed deadlines are dropped rather than
//! fired in a burst.

use anyhow::{Context, Result};
use log::*;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub struct Ticker {
    stop_tx: Option<Sender<()>>,
    thread_handle: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Spawns the ticker thread.
    ///
    /// `on_tick` returns `false` to stop the ticker from inside, for example
    /// when the receiving side has gone away.
    pub fn spawn<F>(interval: Duration, mut on_tick: F) -> Result<Self>
    where
        F: FnMut(u64) -> bool + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let thread_handle = thread::Builder::new()
            .name("ticker".to_string())
            .spawn(move || {
                info!("Ticker: Started (interval: {:?})", interval);
                let start = Instant::now();
                let mut tick: u64 = 0;
                let mut deadline = start + interval;
                loop {
                    let wait = deadline.saturating_duration_since(Instant::now());
                    match stop_rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                            debug!("Ticker: Stop requested");
                            break;
                        }
                    }

                    tick += 1;
                    if !on_tick(tick) {
                        info!("Ticker: Receiver gone, exiting");
                        break;
                    }

                    deadline += interval;
                    let now = Instant::now();
                    if deadline <= now {
                        let behind = now.duration_since(deadline);
                        let missed = (behind.as_nanos() / interval.as_nanos().max(1)) as u32 + 1;
                        trace!("Ticker: Dropping {} missed deadline(s)", missed);
                        deadline += interval * missed;
                    }
                }
                debug!("Ticker: Thread exiting after {} ticks", tick);
            })
            .context("Failed to spawn ticker thread")?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            thread_handle: Some(thread_handle),
        })
    }

    /// Stops the ticker and waits for its thread. No tick fires after this
    /// returns. Calling it again is a no-op.
    pub fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                error!("Ticker thread panicked: {:?}", e);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use test_log::test;

    #[test]
    fn ticks_arrive_in_order_until_stopped() {
        let (tx, rx) = mpsc::channel();
        let mut ticker = Ticker::spawn(Duration::from_millis(5), move |tick| {
            tx.send(tick).is_ok()
        })
        .unwrap();
        let first: Vec<u64> = (0..3)
            .map(|_| rx.recv_timeout(Duration::from_secs(2)).unwrap())
            .collect();
        assert_eq!(first, vec![1, 2, 3]);
        ticker.stop();
        assert!(!ticker.is_running());
        while rx.try_recv().is_ok() {}
        thread::sleep(Duration::from_millis(20));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn callback_returning_false_ends_the_thread() {
        let count = Arc::new(AtomicU64::new(0));
        let seen = Arc::clone(&count);
        let ticker = Ticker::spawn(Duration::from_millis(1), move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            false
        })
        .unwrap();
        thread::sleep(Duration::from_millis(50));
        assert!(!ticker.is_running());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stop_is_idempotent() {
        let mut ticker = Ticker::spawn(Duration::from_secs(60), |_| true).unwrap();
        ticker.stop();
        ticker.stop();
        assert!(!ticker.is_running());
    }
}
