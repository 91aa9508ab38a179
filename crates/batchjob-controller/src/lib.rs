//! BatchJob queue, state machine and reconciler
//!
//! The [`controller::Context`] is shared between the controller runtime,
//! which calls [`reconcile`] and [`error_policy`], and the extender API, which
//! reads the queue and calls [`controller::Context::place`].

#![deny(missing_docs)]

pub mod controller;
pub mod job;
pub mod locks;
pub mod queue;
pub mod resource;
pub mod state;
pub mod store;

pub use controller::{error_policy, reconcile, Context, ControllerConfig, CONTROLLER_NAME};
pub use queue::{JobDescription, JobQueue};
pub use state::FailedSubmissionPolicy;
pub use store::{EngineStatus, JobStore, SparkStore};
