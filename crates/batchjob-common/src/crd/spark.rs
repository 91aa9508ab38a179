//! Spark operator payload types
//!
//! Typed subset of `sparkoperator.k8s.io/v1beta2` `SparkApplicationSpec`. Only
//! the fields a BatchJob needs to carry are modelled; the per-role pod specs
//! expose the labels, annotations and scheduler name the placement path sets.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::job::JobState;

/// Application language
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum SparkAppType {
    /// Scala application
    #[default]
    Scala,
    /// Java application
    Java,
    /// Python application
    Python,
    /// R application
    R,
}

/// Spark deploy mode
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeployMode {
    /// Driver runs inside the cluster
    #[default]
    Cluster,
    /// Driver runs in the submitting process
    Client,
}

/// Pod settings shared by the driver and executor templates
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SparkPodSpec {
    /// CPU request in cores
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cores: Option<i32>,

    /// Hard CPU limit (e.g. "500m")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_limit: Option<String>,

    /// Memory request (e.g. "512m")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,

    /// Image override for this role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Labels added to the role's pods
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Annotations added to the role's pods
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    /// Environment variables
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env_vars: BTreeMap<String, String>,

    /// Service account the pods run as
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,

    /// Scheduler that places the role's pods
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduler_name: Option<String>,
}

/// Driver role
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DriverSpec {
    /// Shared pod settings
    #[serde(flatten)]
    pub pod: SparkPodSpec,

    /// Explicit driver pod name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_name: Option<String>,
}

/// Executor role
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorSpec {
    /// Shared pod settings
    #[serde(flatten)]
    pub pod: SparkPodSpec,

    /// Number of executor pods
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instances: Option<i32>,
}

/// Pod role within a Spark application
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SparkRole {
    /// The driver pod
    Driver,
    /// Executor pods
    Executor,
}

/// Spark application payload
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SparkApplicationSpec {
    /// Application language
    #[serde(rename = "type", default)]
    pub app_type: SparkAppType,

    /// Spark version the image ships
    #[serde(default)]
    pub spark_version: String,

    /// Deploy mode
    #[serde(default)]
    pub mode: DeployMode,

    /// Container image for driver and executors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Image pull policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_policy: Option<String>,

    /// Main class for JVM applications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_class: Option<String>,

    /// Application jar/script location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_application_file: Option<String>,

    /// Arguments passed to the application
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<String>,

    /// Spark configuration properties
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub spark_conf: BTreeMap<String, String>,

    /// Driver settings
    #[serde(default)]
    pub driver: DriverSpec,

    /// Executor settings
    #[serde(default)]
    pub executor: ExecutorSpec,
}

impl SparkApplicationSpec {
    /// Pod settings for every role, driver first
    pub fn roles_mut(&mut self) -> [(SparkRole, &mut SparkPodSpec); 2] {
        [
            (SparkRole::Driver, &mut self.driver.pod),
            (SparkRole::Executor, &mut self.executor.pod),
        ]
    }

    /// Pod settings of one role
    pub fn role(&self, role: SparkRole) -> &SparkPodSpec {
        match role {
            SparkRole::Driver => &self.driver.pod,
            SparkRole::Executor => &self.executor.pod,
        }
    }
}

// =============================================================================
// Engine state
// =============================================================================

/// Application state reported by the Spark operator in
/// `status.applicationState.state`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineState {
    /// Created but not yet picked up (no state reported)
    New,
    /// Submitted to the cluster
    Submitted,
    /// Driver running
    Running,
    /// Finished successfully
    Completed,
    /// Finished with failure
    Failed,
    /// Any other operator state (e.g. PENDING_RERUN, SUBMISSION_FAILED)
    Other(String),
}

impl EngineState {
    /// Parse the Spark operator's state string
    pub fn parse(state: &str) -> Self {
        match state {
            "" => Self::New,
            "SUBMITTED" => Self::Submitted,
            "RUNNING" => Self::Running,
            "COMPLETED" => Self::Completed,
            "FAILED" => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }

    /// The job state this engine state maps to.
    ///
    /// Only the four mirrored states map; everything else leaves the job
    /// state where it is.
    pub fn job_state(&self) -> Option<JobState> {
        match self {
            Self::Submitted => Some(JobState::Submitted),
            Self::Running => Some(JobState::Running),
            Self::Completed => Some(JobState::Completed),
            Self::Failed => Some(JobState::Failed),
            Self::New | Self::Other(_) => None,
        }
    }
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "NEW"),
            Self::Submitted => write!(f, "SUBMITTED"),
            Self::Running => write!(f, "RUNNING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}
