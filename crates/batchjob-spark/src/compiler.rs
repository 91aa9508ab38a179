//! SparkApplication compilation from BatchJob specs
//!
//! Copies the job's Spark payload and stamps the placement onto it:
//! desired-node annotation and job-name label on every role, the executor
//! label on the executor only, and the extender's scheduler name on every role
//! so kube-scheduler routes the pods through the extender.

use std::collections::BTreeMap;

use batchjob_common::crd::{BatchJob, SparkRole};
use batchjob_common::{JobKey, DESIRED_NODE_ANNOTATION, EXECUTOR_POD_LABEL, JOB_NAME_LABEL};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::core::{ApiResource, GroupVersionKind};
use kube::Resource;

use crate::types::{
    SparkApplication, SPARK_API_VERSION, SPARK_GROUP, SPARK_KIND, SPARK_PLURAL, SPARK_VERSION,
};

const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
const MANAGER: &str = "batchjob-operator";

/// Compile a placed BatchJob into the SparkApplication to create.
///
/// The application shares the job's name and namespace and is owned by the
/// job, so deleting the job garbage-collects it.
pub fn compile_spark_application(
    job: &BatchJob,
    node: &str,
    scheduler_name: &str,
) -> SparkApplication {
    let key = JobKey::of(job);

    let mut spec = job.spec.spark.clone();
    for (role, pod) in spec.roles_mut() {
        pod.annotations
            .insert(DESIRED_NODE_ANNOTATION.to_string(), node.to_string());
        pod.labels
            .insert(JOB_NAME_LABEL.to_string(), key.name.clone());
        if role == SparkRole::Executor {
            pod.labels
                .insert(EXECUTOR_POD_LABEL.to_string(), "true".to_string());
        } else {
            // A user-supplied label must not make the driver look like an executor
            pod.labels.remove(EXECUTOR_POD_LABEL);
        }
        pod.scheduler_name = Some(scheduler_name.to_string());
    }

    // Without a uid there is nothing to own; the job has not been persisted yet
    let owner = job.controller_owner_ref(&()).map(|owner| OwnerReference {
        block_owner_deletion: Some(true),
        ..owner
    });

    SparkApplication {
        api_version: SPARK_API_VERSION.to_string(),
        kind: SPARK_KIND.to_string(),
        metadata: ObjectMeta {
            name: Some(key.name.clone()),
            namespace: Some(key.namespace),
            labels: Some(BTreeMap::from([
                (MANAGED_BY_LABEL.to_string(), MANAGER.to_string()),
                (JOB_NAME_LABEL.to_string(), key.name),
            ])),
            annotations: Some(BTreeMap::from([(
                DESIRED_NODE_ANNOTATION.to_string(),
                node.to_string(),
            )])),
            owner_references: owner.map(|o| vec![o]),
            ..Default::default()
        },
        spec,
    }
}

/// Dynamic API resource for SparkApplications
pub fn spark_api_resource() -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk(SPARK_GROUP, SPARK_VERSION, SPARK_KIND),
        SPARK_PLURAL,
    )
}
