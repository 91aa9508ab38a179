//! BatchJob facade
//!
//! Reads jobs and writes their status. Status writes are optimistic: each
//! attempt re-reads the job and writes against its resourceVersion, and a lost
//! race is retried with backoff a bounded number of times.

use std::sync::Arc;
use std::time::Duration;

use batchjob_common::crd::{BatchJob, BatchJobStatus, JobState};
use batchjob_common::retry::{retry_with_backoff_if, RetryConfig};
use batchjob_common::{Error, JobKey, Result, BATCHJOB_FINALIZER};
use tracing::debug;

use crate::store::JobStore;

/// Default number of status write attempts before giving up
pub const DEFAULT_STATUS_UPDATE_ATTEMPTS: u32 = 5;

/// Reads and updates BatchJobs
pub struct JobController {
    store: Arc<dyn JobStore>,
    retry: RetryConfig,
}

impl JobController {
    /// Create a controller retrying conflicting writes up to `attempts` times
    pub fn new(store: Arc<dyn JobStore>, attempts: u32) -> Self {
        Self::with_retry(
            store,
            RetryConfig {
                max_attempts: attempts.max(1),
                initial_delay: Duration::from_millis(50),
                max_delay: Duration::from_secs(2),
                backoff_multiplier: 2.0,
            },
        )
    }

    /// Create a controller with explicit conflict backoff
    pub fn with_retry(store: Arc<dyn JobStore>, retry: RetryConfig) -> Self {
        Self { store, retry }
    }

    /// Fetch a job; `NotFound` if it does not exist
    pub async fn get(&self, key: &JobKey) -> Result<BatchJob> {
        self.store
            .get(key)
            .await?
            .ok_or_else(|| Error::not_found("BatchJob", key))
    }

    /// Fetch a job; `Ok(None)` if it does not exist
    pub async fn find(&self, key: &JobKey) -> Result<Option<BatchJob>> {
        self.store.get(key).await
    }

    /// Set the job's state and error.
    ///
    /// No write happens if the status already matches. Conflicts are retried;
    /// once the attempt budget is spent the result is `ConflictExhausted`.
    pub async fn update_state(
        &self,
        key: &JobKey,
        state: JobState,
        error: Option<String>,
    ) -> Result<()> {
        let operation = format!("update-state {key}");
        retry_with_backoff_if(&self.retry, &operation, Error::is_conflict, || {
            let error = error.clone();
            async move {
                let job = self.get(key).await?;
                let status = BatchJobStatus {
                    state,
                    error,
                    observed_generation: job.metadata.generation,
                };
                if job.status.as_ref() == Some(&status) {
                    return Ok(());
                }
                self.store
                    .write_status(key, job.metadata.resource_version.clone(), &status)
                    .await?;
                debug!(job = %key, %state, "status written");
                Ok(())
            }
        })
        .await
        .map_err(|e| {
            if e.is_conflict() {
                Error::ConflictExhausted {
                    key: key.clone(),
                    attempts: self.retry.max_attempts,
                }
            } else {
                e
            }
        })
    }

    /// Ensure the cleanup finalizer is present
    pub async fn add_finalizer(&self, key: &JobKey) -> Result<()> {
        self.store.add_finalizer(key, BATCHJOB_FINALIZER).await
    }

    /// Release the job for deletion
    pub async fn remove_finalizer(&self, key: &JobKey) -> Result<()> {
        self.store.remove_finalizer(key, BATCHJOB_FINALIZER).await
    }
}
