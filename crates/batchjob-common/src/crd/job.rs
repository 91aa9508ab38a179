//! BatchJob CRD types
//!
//! A `BatchJob` wraps a Spark application spec. It waits in the operator's
//! queue until an external agent places it on a node, after which its state
//! mirrors the `SparkApplication` created for it.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::spark::SparkApplicationSpec;

// =============================================================================
// State
// =============================================================================

/// Lifecycle state of a BatchJob
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum JobState {
    /// Waiting in the queue for a placement decision
    #[default]
    InQueue,
    /// SparkApplication created, engine has accepted it
    Submitted,
    /// Engine reports the application running
    Running,
    /// Engine reports the application completed successfully
    Completed,
    /// SparkApplication creation was rejected
    FailedSubmission,
    /// Engine reports the application failed
    Failed,
}

impl JobState {
    /// States after which the operator does nothing further on its own
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::FailedSubmission)
    }

    /// States in which a SparkApplication is expected to exist
    pub fn expects_engine(self) -> bool {
        matches!(
            self,
            Self::Submitted | Self::Running | Self::Completed | Self::Failed
        )
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InQueue => write!(f, "InQueue"),
            Self::Submitted => write!(f, "Submitted"),
            Self::Running => write!(f, "Running"),
            Self::Completed => write!(f, "Completed"),
            Self::FailedSubmission => write!(f, "FailedSubmission"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

// =============================================================================
// CRD
// =============================================================================

/// Batch analytics job executed by the Spark operator once placed
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "batchjob.gcr.io",
    version = "v1alpha1",
    kind = "BatchJob",
    plural = "batchjobs",
    shortname = "bj",
    namespaced,
    status = "BatchJobStatus",
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct BatchJobSpec {
    /// Spark application to run once the job is placed
    pub spark: SparkApplicationSpec,

    /// Free-form note, carried unchanged through the job's lifecycle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Status of a BatchJob
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchJobStatus {
    /// Current lifecycle state
    #[serde(default)]
    pub state: JobState,

    /// Error that moved the job into a failure state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Generation of the spec observed when the state was written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl BatchJob {
    /// Current state, or None if the operator has not seen the job yet
    pub fn state(&self) -> Option<JobState> {
        self.status.as_ref().map(|s| s.state)
    }

    /// Whether the given finalizer is present
    pub fn has_finalizer(&self, finalizer: &str) -> bool {
        self.metadata
            .finalizers
            .as_ref()
            .is_some_and(|f| f.iter().any(|s| s == finalizer))
    }

    /// Whether the job is being deleted
    pub fn is_deleting(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }
}

// =============================================================================
// Tests
// =============================================================================
