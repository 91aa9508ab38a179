//! Common types for the BatchJob operator: CRDs, errors, and utilities

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod events;
pub mod key;
pub mod retry;
pub mod telemetry;

pub use error::Error;
pub use key::JobKey;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// API group of the BatchJob CRD
pub const BATCHJOB_GROUP: &str = "batchjob.gcr.io";

/// API version of the BatchJob CRD
pub const BATCHJOB_VERSION: &str = "v1alpha1";

/// Finalizer guarding cleanup of queue entries and SparkApplications
pub const BATCHJOB_FINALIZER: &str = "batchjob.gcr.io/cleanup";

/// Annotation carrying the node chosen by the placement decision
pub const DESIRED_NODE_ANNOTATION: &str = "batchjob.gcr.io/desired-node";

/// Label naming the BatchJob a pod belongs to (set on every role template)
pub const JOB_NAME_LABEL: &str = "batchjob.gcr.io/job-name";

/// Label present only on executor pods
pub const EXECUTOR_POD_LABEL: &str = "batchjob.gcr.io/executor";

/// Scheduler name registered for the extender, used when none is configured
pub const DEFAULT_SCHEDULER_NAME: &str = "batchjob-scheduler";

/// Field manager used for server-side apply and status writes
pub const FIELD_MANAGER: &str = "batchjob-controller";

/// Default listen address of the extender HTTP server
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:9090";
