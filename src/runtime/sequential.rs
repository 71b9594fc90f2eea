//! # Sequential task queue.
//!
//! [`SequentialQueue`] runs submitted jobs **one at a time, in submission order**
//! on a single dedicated worker task. It is a thin wrapper over an unbounded
//! [`tokio::sync::mpsc`] channel.
//!
//! ## Architecture
//! ```text
//! submit(job) ──► [unbounded mpsc] ──► worker ──► spawn_blocking(job).await
//!                                        │                 │
//!                                        │          panic → HookPanicked
//!                                        └──► next job only after the previous returned
//! ```
//!
//! ## Rules
//! - **FIFO**: jobs run in the order `submit` was called
//! - **Off the async workers**: each job runs on the blocking pool, so user code may block
//! - **Isolation**: a panicking job is reported and the worker moves on
//! - **Drain on stop**: `stop()` refuses new jobs, lets queued jobs finish, then joins the worker

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::panic_info;
use crate::events::{Event, EventKind};
use crate::runtime::Context;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Single-worker FIFO job queue.
pub struct SequentialQueue {
    name: Arc<str>,
    tx: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SequentialQueue {
    /// Creates the queue and spawns its worker on the context executor.
    pub fn new(ctx: &Context, name: impl Into<Arc<str>>) -> Self {
        let name: Arc<str> = name.into();
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let ctx_for_worker = ctx.clone();
        let worker_name = Arc::clone(&name);

        let worker = ctx.spawn(async move {
            while let Some(job) = rx.recv().await {
                let run = ctx_for_worker.handle().spawn_blocking(job);
                if let Err(err) = run.await {
                    if err.is_panic() {
                        let info = panic_info(&*err.into_panic());
                        ctx_for_worker.publish(
                            Event::new(EventKind::HookPanicked)
                                .with_source(Arc::clone(&worker_name))
                                .with_reason(info),
                        );
                    }
                }
            }
        });

        Self {
            name,
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Returns the queue name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enqueues a job. Returns `false` if the queue was stopped.
    pub fn submit<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        match tx.as_ref() {
            Some(tx) => tx.send(Box::new(job)).is_ok(),
            None => false,
        }
    }

    /// Stops accepting jobs, drains the queued ones and waits for the worker.
    ///
    /// Calling it again is a no-op.
    pub async fn stop(&self) {
        drop(self.tx.lock().unwrap_or_else(PoisonError::into_inner).take());
        let worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(worker) = worker {
            let _ = worker.await;
        }
    }
}
