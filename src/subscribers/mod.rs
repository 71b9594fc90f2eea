//! # Event subscribers for the statevisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and a built-in [`LogWriter`] for handling runtime events broadcast through
//! the [`Bus`](crate::Bus).
//!
//! ## Architecture
//! ```text
//! Resolver / DynamicState / AdmissionController
//!        │ publish(Event)
//!        ▼
//!       Bus ──► Context listener ──► SubscriberSet::emit(&Event)
//!                                     ┌────┴────┬─────────┐
//!                                     ▼         ▼         ▼
//!                                 LogWriter  Metrics   Custom
//! ```

mod subscribe;
mod subscriber_set;

#[cfg(feature = "logging")]
mod log;

pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;

#[cfg(feature = "logging")]
pub use log::LogWriter;
