//! # Function-backed solver (`SolveFn`)
//!
//! [`SolveFn`] wraps a closure `F: Fn() -> Fut`, producing a fresh future per
//! `solve()` call. Shared state goes into `Arc<...>` captured by the closure.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use statevisor::{Resolution, SolveError, SolveFn, Solve};
//!
//! let solver: Arc<dyn Solve> = SolveFn::arc(|| async { Ok::<_, SolveError>(Resolution::Resolved) });
//! # drop(solver);
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SolveError;
use crate::resolver::solve::{Resolution, Solve};

/// Function-backed [`Solve`] implementation.
#[derive(Debug)]
pub struct SolveFn<F> {
    f: F,
}

impl<F> SolveFn<F> {
    /// Creates a new function-backed solver.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the solver and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Solve for SolveFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Resolution, SolveError>> + Send + 'static,
{
    async fn solve(&self) -> Result<Resolution, SolveError> {
        (self.f)().await
    }
}
