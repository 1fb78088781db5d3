// src/classifier/fixed.rs

//! Scripted classifier that returns preset distributions.
//!
//! Used to drive the prediction loop without trained weights: replies are
//! served from a queue, then the fallback distribution repeats forever. An
//! optional delay simulates a slow model.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::classifier::Classifier;
use crate::raster::InputTensor;

pub struct FixedClassifier {
    scripted: Mutex<VecDeque<Vec<f32>>>,
    fallback: Vec<f32>,
    delay: Duration,
    calls: AtomicUsize,
}

impl FixedClassifier {
    /// Always answers with `distribution`.
    pub fn new(distribution: Vec<f32>) -> Self {
        Self {
            scripted: Mutex::new(VecDeque::new()),
            fallback: distribution,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Equal probability for each of `classes` classes.
    pub fn uniform(classes: usize) -> Self {
        Self::new(vec![1.0 / classes as f32; classes])
    }

    /// Sleeps for `delay` inside every `predict` call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queues replies served before the fallback, in order.
    pub fn with_script(self, replies: impl IntoIterator<Item = Vec<f32>>) -> Self {
        if let Ok(mut scripted) = self.scripted.lock() {
            scripted.extend(replies);
        }
        self
    }

    /// Number of `predict` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for FixedClassifier {
    fn predict(&self, _input: &InputTensor) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        let mut scripted = self
            .scripted
            .lock()
            .map_err(|_| anyhow!("FixedClassifier script lock poisoned"))?;
        Ok(scripted.pop_front().unwrap_or_else(|| self.fallback.clone()))
    }

    fn describe(&self) -> String {
        format!("fixed classifier ({} classes)", self.fallback.len())
    }
}
