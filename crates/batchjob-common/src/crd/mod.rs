//! Custom Resource Definitions
//!
//! - [`BatchJob`]: the user-facing job resource owned by this operator
//! - [`SparkApplicationSpec`]: the Spark operator payload embedded in a job and
//!   copied into the `SparkApplication` created on placement

mod job;
mod spark;

pub use job::{BatchJob, BatchJobSpec, BatchJobStatus, JobState};
pub use spark::{
    DeployMode, DriverSpec, EngineState, ExecutorSpec, SparkAppType, SparkApplicationSpec,
    SparkPodSpec, SparkRole,
};
