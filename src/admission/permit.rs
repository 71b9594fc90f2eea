use std::sync::Arc;

use crate::admission::controller::AdmissionController;
use crate::admission::error::ControllerError;

/// Running activity that ends itself when dropped.
///
/// Returned by [`AdmissionController::acquire`].
#[must_use = "dropping the permit ends the activity immediately"]
pub struct ActivityPermit {
    controller: AdmissionController,
    activity: Arc<str>,
    released: bool,
}

impl ActivityPermit {
    pub(crate) fn new(controller: AdmissionController, activity: Arc<str>) -> Self {
        Self {
            controller,
            activity,
            released: false,
        }
    }

    /// Returns the activity name.
    pub fn activity(&self) -> &str {
        &self.activity
    }

    /// Ends the activity now, reporting policy faults.
    pub fn release(mut self) -> Result<(), ControllerError> {
        self.released = true;
        self.controller.activity_ended(&self.activity)
    }
}

impl Drop for ActivityPermit {
    fn drop(&mut self) {
        if !self.released {
            let _ = self.controller.activity_ended(&self.activity);
        }
    }
}

impl std::fmt::Debug for ActivityPermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityPermit")
            .field("activity", &self.activity)
            .finish()
    }
}
