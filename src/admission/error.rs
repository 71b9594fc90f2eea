use thiserror::Error;

/// Error returned by [`AdmissionController`](crate::AdmissionController) operations.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    /// Controller was stopped; the request was refused or withdrawn.
    #[error("admission controller closed")]
    Closed,

    /// `activity_ended` was called for an activity with no running instance.
    #[error("activity '{activity}' is not running")]
    NotRunning {
        /// The activity name passed to `activity_ended`.
        activity: String,
    },

    /// Policy code panicked; the controller closed itself.
    #[error("admission policy fault: {reason}")]
    PolicyFault {
        /// Panic info/message.
        reason: String,
    },
}

impl ControllerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use statevisor::ControllerError;
    ///
    /// let err = ControllerError::NotRunning { activity: "upload".into() };
    /// assert_eq!(err.as_label(), "controller_not_running");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ControllerError::Closed => "controller_closed",
            ControllerError::NotRunning { .. } => "controller_not_running",
            ControllerError::PolicyFault { .. } => "controller_policy_fault",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ControllerError::Closed => "controller closed".to_string(),
            ControllerError::NotRunning { activity } => {
                format!("activity ended but not running: {activity}")
            }
            ControllerError::PolicyFault { reason } => format!("policy fault: {reason}"),
        }
    }

    /// True if the controller will refuse every further request.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ControllerError::Closed | ControllerError::PolicyFault { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_stable() {
        assert_eq!(ControllerError::Closed.as_label(), "controller_closed");
        let fault = ControllerError::PolicyFault {
            reason: "boom".into(),
        };
        assert_eq!(fault.as_label(), "controller_policy_fault");
        assert_eq!(fault.as_message(), "policy fault: boom");
        assert!(fault.is_terminal());
        assert!(
            !ControllerError::NotRunning {
                activity: "x".into()
            }
            .is_terminal()
        );
    }
}
