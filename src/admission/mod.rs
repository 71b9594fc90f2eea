//! Admission control for named activities.
//!
//! - [`AdmissionController`]: queue of requests, admitted under a policy
//! - [`AdmissionPolicy`]: cap, priority and per-activity admissibility
//! - [`MaxActivities`], [`ActivityLimits`]: ready-made policies
//! - [`ActivityPermit`]: RAII handle for an admitted activity

mod controller;
mod counts;
mod error;
mod limits;
mod permit;
mod policy;

pub use controller::AdmissionController;
pub use counts::RunningCounts;
pub use error::ControllerError;
pub use limits::ActivityLimits;
pub use permit::ActivityPermit;
pub use policy::{AdmissionPolicy, MaxActivities};
