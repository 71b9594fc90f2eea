//! Coalescing state resolution.
//!
//! - [`Solve`] / [`Resolution`]: the user callback and what it reports
//! - [`SolveFn`]: closure-backed `Solve`
//! - [`Resolver`]: the single-worker, coalescing driver
//! - [`ChangeSignal`]: weak handle used by background work to report changes

mod core;
mod solve;
mod solve_fn;

pub use core::{ChangeSignal, Resolver};
pub use solve::{Resolution, Solve};
pub use solve_fn::SolveFn;
