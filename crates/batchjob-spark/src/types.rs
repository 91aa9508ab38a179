//! SparkApplication serialization types
//!
//! Typed representation of the `sparkoperator.k8s.io/v1beta2` SparkApplication
//! this operator creates. The spec reuses the payload type embedded in the
//! BatchJob so nothing is lost between the two.

use batchjob_common::crd::SparkApplicationSpec;
use batchjob_common::{JobKey, DESIRED_NODE_ANNOTATION};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

/// API group of the Spark operator
pub const SPARK_GROUP: &str = "sparkoperator.k8s.io";
/// API version of SparkApplication
pub const SPARK_VERSION: &str = "v1beta2";
/// `apiVersion` field value
pub const SPARK_API_VERSION: &str = "sparkoperator.k8s.io/v1beta2";
/// Kind of SparkApplication
pub const SPARK_KIND: &str = "SparkApplication";
/// Plural resource name
pub const SPARK_PLURAL: &str = "sparkapplications";

/// SparkApplication as created through `Api<DynamicObject>`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SparkApplication {
    /// Always [`SPARK_API_VERSION`]
    pub api_version: String,
    /// Always [`SPARK_KIND`]
    pub kind: String,
    /// Name and namespace mirror the owning BatchJob
    pub metadata: ObjectMeta,
    /// The job's Spark payload with the placement stamped on
    pub spec: SparkApplicationSpec,
}

impl SparkApplication {
    /// Identity of the owning job; applications share its name and namespace
    pub fn key(&self) -> JobKey {
        JobKey::new(
            self.metadata.namespace.as_deref().unwrap_or_default(),
            self.metadata.name.as_deref().unwrap_or_default(),
        )
    }

    /// Node this application was placed on, read from its annotation
    pub fn desired_node(&self) -> Option<&str> {
        self.metadata
            .annotations
            .as_ref()?
            .get(DESIRED_NODE_ANNOTATION)
            .map(String::as_str)
    }
}
