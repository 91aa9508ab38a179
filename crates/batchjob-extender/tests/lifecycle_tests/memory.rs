//! In-memory stand-ins for the API server
//!
//! They keep the API server behaviors the operator relies on: resourceVersion
//! preconditions on status writes, AlreadyExists on duplicate creates, and
//! objects lingering while finalizers remain.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use async_trait::async_trait;
use batchjob_common::crd::{BatchJob, BatchJobStatus, EngineState};
use batchjob_common::{Error, JobKey};
use batchjob_controller::store::{EngineStatus, JobStore, SparkStore};
use batchjob_extender::types::PodDescription;
use batchjob_extender::ClusterView;
use batchjob_spark::SparkApplication;
use parking_lot::Mutex;

fn api_error(code: u16, reason: &str, message: String) -> Error {
    Error::from(kube::Error::Api(kube::core::ErrorResponse {
        status: "Failure".to_string(),
        message,
        reason: reason.to_string(),
        code,
    }))
}

#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<BTreeMap<JobKey, BatchJob>>,
    version: AtomicU64,
    injected_conflicts: AtomicU32,
}

impl MemoryJobStore {
    fn bump(&self, job: &mut BatchJob) {
        let rv = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        job.metadata.resource_version = Some(rv.to_string());
    }

    /// Create a job the way the API server would
    pub fn create(&self, mut job: BatchJob) -> JobKey {
        let key = JobKey::of(&job);
        job.metadata.uid = Some(format!("uid-{}", key.name));
        job.metadata.generation = Some(1);
        self.bump(&mut job);
        self.jobs.lock().insert(key.clone(), job);
        key
    }

    pub fn snapshot(&self, key: &JobKey) -> Option<BatchJob> {
        self.jobs.lock().get(key).cloned()
    }

    /// Request deletion; the object stays until its finalizers are gone
    pub fn delete(&self, key: &JobKey) {
        let mut jobs = self.jobs.lock();
        let Some(job) = jobs.get_mut(key) else {
            return;
        };
        if job.metadata.finalizers.as_ref().is_none_or(Vec::is_empty) {
            jobs.remove(key);
            return;
        }
        job.metadata.deletion_timestamp =
            Some(serde_json::from_value(serde_json::json!("2024-01-01T00:00:00Z")).unwrap());
        self.bump(job);
    }

    /// Make the next `n` status writes lose the optimistic-concurrency race
    pub fn inject_conflicts(&self, n: u32) {
        self.injected_conflicts.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn get(&self, key: &JobKey) -> Result<Option<BatchJob>, Error> {
        Ok(self.snapshot(key))
    }

    async fn write_status(
        &self,
        key: &JobKey,
        resource_version: Option<String>,
        status: &BatchJobStatus,
    ) -> Result<(), Error> {
        let conflict = self
            .injected_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        let mut jobs = self.jobs.lock();
        let job = jobs
            .get_mut(key)
            .ok_or_else(|| api_error(404, "NotFound", format!("batchjobs {key} not found")))?;
        if conflict
            || (resource_version.is_some() && resource_version != job.metadata.resource_version)
        {
            return Err(api_error(
                409,
                "Conflict",
                format!("operation cannot be fulfilled on batchjobs {key}"),
            ));
        }
        job.status = Some(status.clone());
        self.bump(job);
        Ok(())
    }

    async fn add_finalizer(&self, key: &JobKey, finalizer: &str) -> Result<(), Error> {
        let mut jobs = self.jobs.lock();
        let job = jobs
            .get_mut(key)
            .ok_or_else(|| api_error(404, "NotFound", format!("batchjobs {key} not found")))?;
        let finalizers = job.metadata.finalizers.get_or_insert_with(Vec::new);
        if !finalizers.iter().any(|f| f == finalizer) {
            finalizers.push(finalizer.to_string());
            self.bump(job);
        }
        Ok(())
    }

    async fn remove_finalizer(&self, key: &JobKey, finalizer: &str) -> Result<(), Error> {
        let mut jobs = self.jobs.lock();
        let Some(job) = jobs.get_mut(key) else {
            return Ok(());
        };
        if let Some(finalizers) = job.metadata.finalizers.as_mut() {
            finalizers.retain(|f| f != finalizer);
        }
        self.bump(job);
        let released = job.metadata.deletion_timestamp.is_some()
            && job.metadata.finalizers.as_ref().is_none_or(Vec::is_empty);
        if released {
            jobs.remove(key);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySparkStore {
    apps: Mutex<BTreeMap<JobKey, (SparkApplication, EngineStatus)>>,
    creates: AtomicU32,
    rejection: Mutex<Option<String>>,
}

impl MemorySparkStore {
    pub fn app(&self, key: &JobKey) -> Option<SparkApplication> {
        self.apps.lock().get(key).map(|(app, _)| app.clone())
    }

    /// Report an engine state, as the Spark operator would
    pub fn set_state(&self, key: &JobKey, state: EngineState, error: Option<&str>) {
        if let Some((_, status)) = self.apps.lock().get_mut(key) {
            *status = EngineStatus {
                state,
                error: error.map(str::to_string),
            };
        }
    }

    /// Remove an application behind the operator's back
    pub fn vanish(&self, key: &JobKey) {
        self.apps.lock().remove(key);
    }

    /// Reject every create with `message`, as an admission webhook would
    pub fn reject_creates(&self, message: &str) {
        *self.rejection.lock() = Some(message.to_string());
    }

    /// Accept creates again
    pub fn accept_creates(&self) {
        *self.rejection.lock() = None;
    }

    /// Successful creates so far
    pub fn create_count(&self) -> u32 {
        self.creates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SparkStore for MemorySparkStore {
    async fn create(&self, app: &SparkApplication) -> Result<(), Error> {
        let key = app.key();
        if let Some(message) = self.rejection.lock().clone() {
            return Err(api_error(422, "Invalid", message));
        }
        let mut apps = self.apps.lock();
        if apps.contains_key(&key) {
            return Err(api_error(
                409,
                "AlreadyExists",
                format!("sparkapplications \"{}\" already exists", key.name),
            ));
        }
        apps.insert(key, (app.clone(), EngineStatus::new_app()));
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn status(&self, key: &JobKey) -> Result<Option<EngineStatus>, Error> {
        Ok(self.apps.lock().get(key).map(|(_, status)| status.clone()))
    }

    async fn delete(&self, key: &JobKey) -> Result<(), Error> {
        self.apps.lock().remove(key);
        Ok(())
    }
}

/// Fixed set of empty nodes
pub struct StaticCluster(pub Vec<String>);

#[async_trait]
impl ClusterView for StaticCluster {
    async fn node_names(&self) -> Result<Vec<String>, Error> {
        Ok(self.0.clone())
    }

    async fn scheduled_pods(&self) -> Result<Vec<PodDescription>, Error> {
        Ok(Vec::new())
    }
}
