//! Job queue
//!
//! In-memory registry of BatchJobs waiting for a placement decision. Entries
//! are unique per job and listed in arrival order. All operations take one
//! short-lived lock, so `dequeue` is exactly-once under concurrent callers.

use std::collections::{HashSet, VecDeque};

use batchjob_common::{Error, JobKey, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Externally visible queue entry: `{"jobName": {"name", "namespace"}}`
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDescription {
    /// Identity of the queued job
    #[serde(alias = "JobName")]
    pub job_name: JobKey,
}

impl From<JobKey> for JobDescription {
    fn from(job_name: JobKey) -> Self {
        Self { job_name }
    }
}

#[derive(Default)]
struct Entries {
    order: VecDeque<JobKey>,
    members: HashSet<JobKey>,
}

/// Thread-safe FIFO of jobs awaiting placement
#[derive(Default)]
pub struct JobQueue {
    entries: Mutex<Entries>,
}

impl JobQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job. Fails with `DuplicateEntry` if it is already queued.
    pub fn enqueue(&self, key: JobKey) -> Result<()> {
        let mut entries = self.entries.lock();
        if !entries.members.insert(key.clone()) {
            return Err(Error::DuplicateEntry { key });
        }
        entries.order.push_back(key);
        Ok(())
    }

    /// Remove and return a job's entry. Fails with `NotFound` if absent.
    pub fn dequeue(&self, key: &JobKey) -> Result<JobDescription> {
        let mut entries = self.entries.lock();
        if !entries.members.remove(key) {
            return Err(Error::not_found("queue entry", key));
        }
        if let Some(pos) = entries.order.iter().position(|k| k == key) {
            entries.order.remove(pos);
        }
        Ok(JobDescription::from(key.clone()))
    }

    /// Snapshot of all entries in arrival order
    pub fn list(&self) -> Vec<JobDescription> {
        let entries = self.entries.lock();
        entries
            .order
            .iter()
            .cloned()
            .map(JobDescription::from)
            .collect()
    }

    /// Whether a job is queued
    pub fn contains(&self, key: &JobKey) -> bool {
        self.entries.lock().members.contains(key)
    }

    /// Number of queued jobs
    pub fn len(&self) -> usize {
        self.entries.lock().order.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
