//! Lifecycle stories
//!
//! - `scenario`: a job goes from creation through placement to completion,
//!   and deletion cleans up after it
//! - `placement`: the placement endpoint under partial failure, rejected
//!   submissions and concurrent requests
//! - `extender`: kube-scheduler's view of placed jobs

mod extender;
mod harness;
mod memory;
mod placement;
mod scenario;
