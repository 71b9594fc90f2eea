//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by resolvers, state machines,
//! admission controllers, hook queues and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Resolver` workers, `DynamicState`, `AdmissionController`,
//!   `SequentialQueue`, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the `Context` listener (fans out to `SubscriberSet`) and any
//!   receiver obtained with [`Context::subscribe`](crate::Context::subscribe).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
