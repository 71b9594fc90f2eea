//! Runtime services shared by all primitives.
//!
//! - [`Context`]: explicit handle carrying the executor, the event bus and the config
//! - [`SequentialQueue`]: single-worker FIFO queue used to run transition hooks

mod context;
mod sequential;

pub use context::{Context, ContextBuilder};
pub use sequential::SequentialQueue;
