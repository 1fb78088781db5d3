// src/prediction/worker.rs

//! Inference worker thread.
//!
//! Jobs are processed strictly one at a time in submission order, so there is
//! never more than one classifier call running. Each reply is sent back on the
//! reply channel, after which the waker is poked.
//!
//! The worker counts outstanding jobs from `submit` until the reply is
//! handed back, so a job still waiting in the queue already counts as busy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use log::*;

use crate::classifier::Classifier;
use crate::raster::InputTensor;
use crate::waker::EventLoopWaker;

/// One classifier call, tagged with the tick that requested it.
#[derive(Debug)]
pub struct InferenceJob {
    pub tick: u64,
    pub tensor: InputTensor,
}

/// Raw answer for one job. Validation happens in the prediction loop.
#[derive(Debug)]
pub struct InferenceReply {
    pub tick: u64,
    pub output: Result<Vec<f32>, String>,
    pub elapsed: Duration,
}

pub struct InferenceWorker {
    job_tx: Option<Sender<InferenceJob>>,
    outstanding: Arc<AtomicUsize>,
    thread_handle: Option<JoinHandle<()>>,
}

impl InferenceWorker {
    pub fn spawn(
        classifier: Arc<dyn Classifier>,
        reply_tx: Sender<InferenceReply>,
        waker: Box<dyn EventLoopWaker>,
    ) -> Result<Self> {
        let (job_tx, job_rx) = mpsc::channel::<InferenceJob>();
        let outstanding = Arc::new(AtomicUsize::new(0));
        let pending = Arc::clone(&outstanding);

        let thread_handle = thread::Builder::new()
            .name("inference".to_string())
            .spawn(move || {
                info!("InferenceWorker: Started with {}", classifier.describe());
                while let Ok(job) = job_rx.recv() {
                    let started = Instant::now();
                    let output = classifier
                        .predict(&job.tensor)
                        .map_err(|e| format!("{:#}", e));
                    let elapsed = started.elapsed();
                    trace!(
                        "InferenceWorker: Tick {} finished in {:?}",
                        job.tick,
                        elapsed
                    );

                    let reply = InferenceReply {
                        tick: job.tick,
                        output,
                        elapsed,
                    };
                    // Released before the send so a reader of the reply never
                    // sees the worker as busy with this job.
                    pending.fetch_sub(1, Ordering::SeqCst);
                    if reply_tx.send(reply).is_err() {
                        info!("InferenceWorker: Reply channel closed, exiting");
                        break;
                    }
                    if let Err(e) = waker.wake() {
                        warn!("InferenceWorker: Failed to wake event loop: {:#}", e);
                    }
                }
                debug!("InferenceWorker: Thread exiting");
            })
            .context("Failed to spawn inference worker thread")?;

        Ok(Self {
            job_tx: Some(job_tx),
            outstanding,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn submit(&self, job: InferenceJob) -> Result<()> {
        let job_tx = self
            .job_tx
            .as_ref()
            .ok_or_else(|| anyhow!("Inference worker already shut down"))?;
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        job_tx.send(job).map_err(|_| {
            self.outstanding.fetch_sub(1, Ordering::SeqCst);
            anyhow!("Inference worker thread is gone")
        })
    }

    /// Jobs submitted whose reply has not been handed back yet.
    pub fn outstanding_jobs(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// True while any submitted job is queued or running.
    pub fn is_busy(&self) -> bool {
        self.outstanding_jobs() > 0
    }

    /// Closes the job queue and joins the thread.
    ///
    /// A classifier call that is still running cannot be interrupted; in that
    /// case the thread is detached and exits once the call returns.
    pub fn shutdown(&mut self) {
        self.job_tx.take();
        if let Some(handle) = self.thread_handle.take() {
            if self.is_busy() {
                warn!("InferenceWorker: Classifier still running at shutdown, detaching thread");
                return;
            }
            if let Err(e) = handle.join() {
                error!("InferenceWorker thread panicked: {:?}", e);
            }
        }
    }
}

impl Drop for InferenceWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
