//! Per-job serialization
//!
//! The controller runtime never reconciles one job twice at once, but
//! placement requests arrive over HTTP outside of it. Both paths take the
//! job's lock here before touching the queue, the SparkApplication, or the
//! status, so transitions for one job never interleave.

use std::sync::Arc;

use batchjob_common::JobKey;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Sharded map of per-job async locks
#[derive(Default)]
pub struct KeyLocks {
    locks: DashMap<JobKey, Arc<Mutex<()>>>,
}

impl KeyLocks {
    /// Create an empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a job
    pub async fn lock(&self, key: &JobKey) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the shard is not held across the await
        let mutex = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }

    /// Drop a job's lock once the job is gone. Holders keep their guard.
    pub fn forget(&self, key: &JobKey) {
        self.locks
            .remove_if(key, |_, mutex| Arc::strong_count(mutex) == 1);
    }

    /// Number of tracked jobs
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no job is tracked
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
