//! SparkApplication facade
//!
//! Creates the engine resource for a placed job, reads back its state, and
//! deletes it on cleanup.

use std::sync::Arc;

use batchjob_common::crd::{BatchJob, EngineState};
use batchjob_common::{Error, JobKey, Result};
use batchjob_spark::{compile_spark_application, SparkApplication};
use tracing::{debug, info};

use crate::store::{EngineStatus, SparkStore};

/// Manages the SparkApplications backing BatchJobs
pub struct ResourceController {
    store: Arc<dyn SparkStore>,
    scheduler_name: String,
}

impl ResourceController {
    /// Create a controller stamping `scheduler_name` on every pod template
    pub fn new(store: Arc<dyn SparkStore>, scheduler_name: impl Into<String>) -> Self {
        Self {
            store,
            scheduler_name: scheduler_name.into(),
        }
    }

    /// Create the SparkApplication for `job`, pinned to `node`.
    ///
    /// Any failure, including the object already existing, is reported as
    /// [`Error::Submission`].
    pub async fn create_for_node(&self, job: &BatchJob, node: &str) -> Result<SparkApplication> {
        let key = JobKey::of(job);
        let app = compile_spark_application(job, node, &self.scheduler_name);
        self.store
            .create(&app)
            .await
            .map_err(|e| Error::submission(&key, e.to_string()))?;
        info!(job = %key, node, "SparkApplication created");
        Ok(app)
    }

    /// Delete the job's SparkApplication. Deleting a missing one succeeds.
    pub async fn delete(&self, key: &JobKey) -> Result<()> {
        self.store.delete(key).await?;
        debug!(job = %key, "SparkApplication deleted");
        Ok(())
    }

    /// Engine state of the job's SparkApplication; `NotFound` if there is none
    pub async fn get_state(&self, key: &JobKey) -> Result<EngineState> {
        self.engine_status(key)
            .await?
            .map(|s| s.state)
            .ok_or_else(|| Error::not_found("SparkApplication", key))
    }

    /// Engine state and error of the job's SparkApplication, if it exists
    pub async fn engine_status(&self, key: &JobKey) -> Result<Option<EngineStatus>> {
        self.store.status(key).await
    }
}
