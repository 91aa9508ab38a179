//! Kubernetes access behind traits
//!
//! The job and resource controllers talk to the API server only through
//! [`JobStore`] and [`SparkStore`], which lets tests substitute mocks or
//! in-memory stores for a real cluster.

use async_trait::async_trait;
use batchjob_common::crd::{BatchJob, BatchJobStatus, EngineState};
use batchjob_common::{Error, JobKey, FIELD_MANAGER};
use batchjob_spark::{spark_api_resource, SparkApplication};
use kube::api::{Api, DeleteParams, DynamicObject, Patch, PatchParams, PostParams};
use kube::core::ApiResource;
use kube::Client;
#[cfg(test)]
use mockall::automock;
use tracing::debug;

/// Observed state of a SparkApplication
#[derive(Clone, Debug, PartialEq)]
pub struct EngineStatus {
    /// `status.applicationState.state`
    pub state: EngineState,
    /// `status.applicationState.errorMessage`, if the engine reported one
    pub error: Option<String>,
}

impl EngineStatus {
    /// Status of an application the engine has not reported on yet
    pub fn new_app() -> Self {
        Self {
            state: EngineState::New,
            error: None,
        }
    }

    /// Parse the status block of a SparkApplication object
    pub fn from_object(data: &serde_json::Value) -> Self {
        let app_state = data.get("status").and_then(|s| s.get("applicationState"));
        let state = app_state
            .and_then(|s| s.get("state"))
            .and_then(|s| s.as_str())
            .unwrap_or_default();
        let error = app_state
            .and_then(|s| s.get("errorMessage"))
            .and_then(|m| m.as_str())
            .filter(|m| !m.is_empty())
            .map(str::to_string);
        Self {
            state: EngineState::parse(state),
            error,
        }
    }
}

/// BatchJob reads and writes
#[cfg_attr(test, automock)]
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Fetch a BatchJob; `Ok(None)` if it does not exist
    async fn get(&self, key: &JobKey) -> Result<Option<BatchJob>, Error>;

    /// Write `status` guarded by `resource_version`.
    ///
    /// Fails with a 409 conflict if the object changed since that version.
    async fn write_status(
        &self,
        key: &JobKey,
        resource_version: Option<String>,
        status: &BatchJobStatus,
    ) -> Result<(), Error>;

    /// Add a finalizer if missing
    async fn add_finalizer(&self, key: &JobKey, finalizer: &str) -> Result<(), Error>;

    /// Remove a finalizer if present; a missing job is not an error
    async fn remove_finalizer(&self, key: &JobKey, finalizer: &str) -> Result<(), Error>;
}

/// SparkApplication create/read/delete
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SparkStore: Send + Sync {
    /// Create the application
    async fn create(&self, app: &SparkApplication) -> Result<(), Error>;

    /// Read the application's status; `Ok(None)` if it does not exist
    async fn status(&self, key: &JobKey) -> Result<Option<EngineStatus>, Error>;

    /// Delete the application; a missing application is not an error
    async fn delete(&self, key: &JobKey) -> Result<(), Error>;
}

/// [`JobStore`] backed by the Kubernetes API
pub struct KubeJobStore {
    client: Client,
}

impl KubeJobStore {
    /// Wrap a kube client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, key: &JobKey) -> Api<BatchJob> {
        Api::namespaced(self.client.clone(), &key.namespace)
    }
}

#[async_trait]
impl JobStore for KubeJobStore {
    async fn get(&self, key: &JobKey) -> Result<Option<BatchJob>, Error> {
        Ok(self.api(key).get_opt(&key.name).await?)
    }

    async fn write_status(
        &self,
        key: &JobKey,
        resource_version: Option<String>,
        status: &BatchJobStatus,
    ) -> Result<(), Error> {
        // A resourceVersion in a merge patch is a precondition on the write
        let patch = serde_json::json!({
            "metadata": { "resourceVersion": resource_version },
            "status": status,
        });
        self.api(key)
            .patch_status(
                &key.name,
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(&patch),
            )
            .await?;
        Ok(())
    }

    async fn add_finalizer(&self, key: &JobKey, finalizer: &str) -> Result<(), Error> {
        let api = self.api(key);
        let job = api.get(&key.name).await?;
        let mut finalizers = job.metadata.finalizers.unwrap_or_default();
        if finalizers.iter().any(|f| f == finalizer) {
            return Ok(());
        }
        finalizers.push(finalizer.to_string());

        let patch = serde_json::json!({
            "metadata": {
                "resourceVersion": job.metadata.resource_version,
                "finalizers": finalizers,
            }
        });
        api.patch(
            &key.name,
            &PatchParams::apply(FIELD_MANAGER),
            &Patch::Merge(&patch),
        )
        .await?;
        Ok(())
    }

    async fn remove_finalizer(&self, key: &JobKey, finalizer: &str) -> Result<(), Error> {
        let api = self.api(key);
        let Some(job) = api.get_opt(&key.name).await? else {
            return Ok(());
        };
        let finalizers: Vec<String> = job
            .metadata
            .finalizers
            .unwrap_or_default()
            .into_iter()
            .filter(|f| f != finalizer)
            .collect();

        let patch = serde_json::json!({
            "metadata": {
                "resourceVersion": job.metadata.resource_version,
                "finalizers": finalizers,
            }
        });
        match api
            .patch(
                &key.name,
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(&patch),
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// [`SparkStore`] backed by the Kubernetes API through the dynamic client
pub struct KubeSparkStore {
    client: Client,
    resource: ApiResource,
}

impl KubeSparkStore {
    /// Wrap a kube client
    pub fn new(client: Client) -> Self {
        Self {
            client,
            resource: spark_api_resource(),
        }
    }

    fn api(&self, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, &self.resource)
    }
}

#[async_trait]
impl SparkStore for KubeSparkStore {
    async fn create(&self, app: &SparkApplication) -> Result<(), Error> {
        let key = app.key();
        let obj: DynamicObject = serde_json::from_value(serde_json::to_value(app)?)?;
        self.api(&key.namespace)
            .create(&PostParams::default(), &obj)
            .await?;
        debug!(app = %key, "created SparkApplication");
        Ok(())
    }

    async fn status(&self, key: &JobKey) -> Result<Option<EngineStatus>, Error> {
        let obj = self.api(&key.namespace).get_opt(&key.name).await?;
        Ok(obj.map(|o| EngineStatus::from_object(&o.data)))
    }

    async fn delete(&self, key: &JobKey) -> Result<(), Error> {
        match self
            .api(&key.namespace)
            .delete(&key.name, &DeleteParams::background())
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
