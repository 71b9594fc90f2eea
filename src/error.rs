//! Error types used by the statevisor runtime and user callbacks.
//!
//! This module defines two main error enums:
//!
//! - [`RuntimeError`]: errors raised by the runtime itself while shutting a component down.
//! - [`SolveError`]: faults raised by user-supplied `solve()` / transition code.
//!
//! Admission errors live next to the controller ([`ControllerError`](crate::ControllerError)).
//! All types provide helper methods (`as_label`, `as_message`) for logging/metrics.

use std::any::Any;
use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the statevisor runtime.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// A resolver worker did not exit within the grace period and was aborted.
    #[error("stop of '{name}' exceeded grace {grace:?}; worker aborted")]
    GraceExceeded {
        /// Name of the component being stopped.
        name: String,
        /// The configured grace duration.
        grace: Duration,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use statevisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { name: "sync".into(), grace: Duration::from_secs(5) };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { name, grace } => {
                format!("grace exceeded after {grace:?}; component={name}")
            }
        }
    }
}

/// # Faults raised by user-supplied resolution code.
///
/// Any fault is fatal for the resolver that observed it: the resolver records
/// the error, stops itself and never calls `solve()` again.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolveError {
    /// `solve()` returned an error.
    #[error("solve failed: {error}")]
    Failed {
        /// The underlying error message.
        error: String,
    },

    /// `solve()` (or a transition act) panicked.
    #[error("solve panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl SolveError {
    /// Shorthand for [`SolveError::Failed`].
    ///
    /// # Example
    /// ```
    /// use statevisor::SolveError;
    ///
    /// let err = SolveError::fail("socket closed");
    /// assert_eq!(err.to_string(), "solve failed: socket closed");
    /// ```
    pub fn fail(error: impl Into<String>) -> Self {
        SolveError::Failed {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SolveError::Failed { .. } => "solve_failed",
            SolveError::Panicked { .. } => "solve_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SolveError::Failed { error } => format!("error: {error}"),
            SolveError::Panicked { info } => format!("panic: {info}"),
        }
    }
}

/// Renders a caught panic payload as text.
pub(crate) fn panic_info(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_stable() {
        assert_eq!(SolveError::fail("x").as_label(), "solve_failed");
        let panicked = SolveError::Panicked { info: "boom".into() };
        assert_eq!(panicked.as_label(), "solve_panicked");
        assert_eq!(panicked.as_message(), "panic: boom");
    }

    #[test]
    fn test_panic_info_downcasts() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let borrowed: Box<dyn Any + Send> = Box::new("static");
        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_info(owned.as_ref()), "owned");
        assert_eq!(panic_info(borrowed.as_ref()), "static");
        assert_eq!(panic_info(other.as_ref()), "unknown panic");
    }
}
