//! # Runtime context: the explicit handle every component is created from.
//!
//! A [`Context`] bundles the three services the primitives rely on:
//! - the **executor**: a tokio [`Handle`] used to spawn resolver workers,
//!   hook queues and reminder timers;
//! - the **event bus** every component publishes to;
//! - the shared [`Config`].
//!
//! Contexts are cheap to clone and are passed explicitly; nothing in the crate
//! reaches for process-wide registries.
//!
//! ## Wiring
//! ```text
//! ContextBuilder::build()
//!   ├─► Bus::new(cfg.bus_capacity_clamped())
//!   ├─► SubscriberSet::new(subscribers)      (only when subscribers were given)
//!   └─► listener: Bus.subscribe() ─► SubscriberSet::emit(&Event)
//! ```
//!
//! ## Example
//! ```rust
//! use statevisor::{Config, Context};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let ctx = Context::builder(Config::default()).build();
//!     let mut events = ctx.subscribe();
//!     # drop(events.try_recv());
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::{
    config::Config,
    events::{Bus, Event},
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Context`] with optional subscribers.
pub struct ContextBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    handle: Option<Handle>,
}

impl ContextBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            handle: None,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Uses an explicit runtime handle as executor.
    ///
    /// Without it, [`build`](Self::build) captures [`Handle::current`] and therefore
    /// must be called from within a tokio runtime.
    pub fn with_handle(mut self, handle: Handle) -> Self {
        self.handle = Some(handle);
        self
    }

    /// Builds the context and starts the subscriber listener (if any subscribers were given).
    pub fn build(self) -> Context {
        let handle = self.handle.unwrap_or_else(Handle::current);
        let bus = Bus::new(self.cfg.bus_capacity_clamped());

        if !self.subscribers.is_empty() {
            let set = SubscriberSet::new(self.subscribers, bus.clone(), &handle);
            let mut rx = bus.subscribe();
            handle.spawn(async move {
                loop {
                    match rx.recv().await {
                        Ok(ev) => set.emit(&ev),
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                set.shutdown().await;
            });
        }

        Context {
            inner: Arc::new(ContextInner {
                cfg: self.cfg,
                bus,
                handle,
            }),
        }
    }
}

struct ContextInner {
    cfg: Config,
    bus: Bus,
    handle: Handle,
}

/// Shared runtime services: executor handle, event bus and configuration.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// Returns a builder for a new context.
    pub fn builder(cfg: Config) -> ContextBuilder {
        ContextBuilder::new(cfg)
    }

    /// Creates a context on the current runtime with no subscribers.
    pub fn new(cfg: Config) -> Self {
        ContextBuilder::new(cfg).build()
    }

    /// Returns the runtime configuration.
    pub fn config(&self) -> &Config {
        &self.inner.cfg
    }

    /// Returns the event bus.
    pub fn bus(&self) -> &Bus {
        &self.inner.bus
    }

    /// Returns the executor handle.
    pub fn handle(&self) -> &Handle {
        &self.inner.handle
    }

    /// Creates a receiver for subsequent runtime events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.bus.subscribe()
    }

    /// Publishes an event on the context bus.
    pub(crate) fn publish(&self, ev: Event) {
        self.inner.bus.publish(ev);
    }

    /// Submits a unit of work to the executor.
    pub(crate) fn spawn<F>(&self, fut: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.inner.handle.spawn(fut)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("cfg", &self.inner.cfg)
            .finish_non_exhaustive()
    }
}
