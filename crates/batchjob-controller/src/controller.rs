//! BatchJob reconciler and placement
//!
//! Two paths drive a job through its lifecycle:
//!
//! - [`reconcile`], run by the controller runtime on every BatchJob or owned
//!   SparkApplication change: admits new jobs into the queue, mirrors engine
//!   state, and cleans up on deletion.
//! - [`Context::place`], called by the extender API when an external agent
//!   picks a node: dequeues the job and creates its SparkApplication.
//!
//! Both take the job's lock from [`KeyLocks`] and re-read the job under it, so
//! a placement and a reconcile of the same job never interleave.

use std::sync::Arc;
use std::time::Duration;

use batchjob_common::crd::{BatchJob, JobState};
use batchjob_common::events::{
    EventPublisher, JobEvent, JobEventAction, JobEventReason, KubeEventPublisher,
};
use batchjob_common::retry::RetryConfig;
use batchjob_common::{Error, JobKey, Result, DEFAULT_SCHEDULER_NAME};
use dashmap::DashMap;
use kube::runtime::controller::Action;
use kube::{Client, Resource};
use tracing::{debug, error, info, instrument, warn};

use crate::job::{JobController, DEFAULT_STATUS_UPDATE_ATTEMPTS};
use crate::locks::KeyLocks;
use crate::queue::JobQueue;
use crate::resource::ResourceController;
use crate::state::{transition, Effect, FailedSubmissionPolicy, Observation, Policy, StatusChange};
use crate::store::{JobStore, KubeJobStore, KubeSparkStore, SparkStore};

/// Name reported on Kubernetes Events
pub const CONTROLLER_NAME: &str = "batchjob-controller";

/// Controller tunables
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    /// Scheduler name stamped on SparkApplication pod templates
    pub scheduler_name: String,
    /// Handling of jobs whose submission failed
    pub failed_submission: FailedSubmissionPolicy,
    /// Attempts for a status write that keeps conflicting
    pub status_update_attempts: u32,
    /// Backoff for failed reconciliations
    pub reconcile_retry: RetryConfig,
    /// Periodic resync of jobs that are not finished
    pub requeue_interval: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            scheduler_name: DEFAULT_SCHEDULER_NAME.to_string(),
            failed_submission: FailedSubmissionPolicy::default(),
            status_update_attempts: DEFAULT_STATUS_UPDATE_ATTEMPTS,
            reconcile_retry: RetryConfig {
                max_attempts: 8,
                initial_delay: Duration::from_secs(1),
                max_delay: Duration::from_secs(300),
                backoff_multiplier: 2.0,
            },
            requeue_interval: Duration::from_secs(300),
        }
    }
}

/// Shared state of the reconciler and the extender API
pub struct Context {
    /// BatchJob access
    pub jobs: JobController,
    /// SparkApplication access
    pub resources: ResourceController,
    /// Jobs awaiting placement
    pub queue: JobQueue,
    /// Event sink
    pub events: Arc<dyn EventPublisher>,
    /// Tunables
    pub config: ControllerConfig,
    locks: KeyLocks,
    failures: DashMap<JobKey, u32>,
}

impl Context {
    /// Assemble a context from explicit stores
    pub fn new(
        job_store: Arc<dyn JobStore>,
        spark_store: Arc<dyn SparkStore>,
        events: Arc<dyn EventPublisher>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            jobs: JobController::new(job_store, config.status_update_attempts),
            resources: ResourceController::new(spark_store, config.scheduler_name.clone()),
            queue: JobQueue::new(),
            events,
            config,
            locks: KeyLocks::new(),
            failures: DashMap::new(),
        }
    }

    /// Context backed by a live cluster
    pub fn from_client(client: Client, config: ControllerConfig) -> Self {
        Self::new(
            Arc::new(KubeJobStore::new(client.clone())),
            Arc::new(KubeSparkStore::new(client.clone())),
            Arc::new(KubeEventPublisher::new(client, CONTROLLER_NAME)),
            config,
        )
    }

    fn policy(&self) -> Policy {
        Policy {
            failed_submission: self.config.failed_submission,
        }
    }

    /// Submit a queued job to `node`.
    ///
    /// Exactly one caller wins for a given job: the queue entry is removed
    /// under the job's lock before anything is created. Fails with `NotFound`
    /// if the job is not queued or no longer exists, and with `Submission` if
    /// the SparkApplication was rejected (the job is then FailedSubmission).
    #[instrument(skip(self, key), fields(job = %key))]
    pub async fn place(&self, key: &JobKey, node: &str) -> Result<()> {
        if node.trim().is_empty() {
            return Err(Error::validation(format!("empty node for job {key}")));
        }

        let _guard = self.locks.lock(key).await;
        if !self.queue.contains(key) {
            return Err(Error::not_found("queue entry", key));
        }

        // Read before dequeuing so a failed read leaves the job in its place
        let job = match self.jobs.find(key).await? {
            Some(job) if !job.is_deleting() => job,
            _ => {
                self.queue.dequeue(key)?;
                return Err(Error::not_found("BatchJob", key));
            }
        };
        self.queue.dequeue(key)?;
        let oref = job.object_ref(&());

        match self.resources.create_for_node(&job, node).await {
            Ok(_) => {
                // The next reconcile mirrors the engine state if this write is lost
                if let Err(e) = self.jobs.update_state(key, JobState::Submitted, None).await {
                    warn!(error = %e, "failed to record Submitted state");
                }
                let event = JobEvent::new(JobEventReason::Submitted, JobEventAction::Place)
                    .with_note(format!("SparkApplication created on node {node}"));
                self.events.publish(&oref, event).await;
                info!(node, "job submitted");
                Ok(())
            }
            Err(e) => {
                let message = match &e {
                    Error::Submission { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                if let Err(write_err) = self
                    .jobs
                    .update_state(key, JobState::FailedSubmission, Some(message.clone()))
                    .await
                {
                    warn!(error = %write_err, "failed to record FailedSubmission state");
                }
                let event = JobEvent::new(JobEventReason::SubmissionFailed, JobEventAction::Place)
                    .with_note(message);
                self.events.publish(&oref, event).await;
                warn!(node, error = %e, "job submission failed");
                Err(e)
            }
        }
    }

    async fn apply_effect(&self, key: &JobKey, effect: &Effect) -> Result<()> {
        match effect {
            Effect::AddFinalizer => self.jobs.add_finalizer(key).await,
            Effect::Enqueue => match self.queue.enqueue(key.clone()) {
                Ok(()) => {
                    debug!(job = %key, "job enqueued");
                    Ok(())
                }
                Err(Error::DuplicateEntry { .. }) => Ok(()),
                Err(e) => Err(e),
            },
            Effect::Dequeue => match self.queue.dequeue(key) {
                Ok(_) => Ok(()),
                Err(e) if e.is_not_found() => Ok(()),
                Err(e) => Err(e),
            },
            Effect::DeleteEngine => self.resources.delete(key).await,
            Effect::RemoveFinalizer => self.jobs.remove_finalizer(key).await,
        }
    }

    async fn publish_state(&self, job: &BatchJob, change: &StatusChange) {
        let mut event = JobEvent::new(
            JobEventReason::for_state(change.state),
            JobEventAction::Reconcile,
        );
        event.note = change.error.clone();
        self.events.publish(&job.object_ref(&()), event).await;
    }

    fn forget(&self, key: &JobKey) {
        self.failures.remove(key);
        self.locks.forget(key);
    }
}

/// Reconcile a BatchJob
#[instrument(skip(job, ctx), fields(job = %JobKey::of(job.as_ref())))]
pub async fn reconcile(job: Arc<BatchJob>, ctx: Arc<Context>) -> Result<Action> {
    let key = JobKey::of(job.as_ref());
    let guard = ctx.locks.lock(&key).await;

    // The cached object may predate a placement that just ran
    let Some(job) = ctx.jobs.find(&key).await? else {
        let _ = ctx.queue.dequeue(&key);
        drop(guard);
        ctx.forget(&key);
        return Ok(Action::await_change());
    };

    let engine = if job.is_deleting() {
        None
    } else {
        ctx.resources.engine_status(&key).await?
    };
    let obs = Observation::of(&job, ctx.queue.contains(&key), engine);
    let next = transition(&obs, &ctx.policy());

    for effect in &next.effects {
        ctx.apply_effect(&key, effect).await?;
    }

    if next.effects.contains(&Effect::RemoveFinalizer) {
        info!("job cleaned up");
        drop(guard);
        ctx.forget(&key);
        return Ok(Action::await_change());
    }

    let state = match &next.next {
        Some(change) => {
            ctx.jobs
                .update_state(&key, change.state, change.error.clone())
                .await?;
            info!(from = ?obs.state, to = %change.state, "job state changed");
            ctx.publish_state(&job, change).await;
            Some(change.state)
        }
        None => obs.state,
    };

    ctx.failures.remove(&key);
    match state {
        Some(state) if state.is_terminal() => Ok(Action::await_change()),
        _ => Ok(Action::requeue(ctx.config.requeue_interval)),
    }
}

/// Back off failed reconciliations exponentially, up to the retry budget
pub fn error_policy(job: Arc<BatchJob>, error: &Error, ctx: Arc<Context>) -> Action {
    let key = JobKey::of(job.as_ref());

    if !error.is_retryable() {
        error!(job = %key, %error, "reconciliation failed permanently");
        ctx.failures.remove(&key);
        return Action::await_change();
    }

    let failures = {
        let mut count = ctx.failures.entry(key.clone()).or_insert(0);
        *count += 1;
        *count
    };
    let retry = &ctx.config.reconcile_retry;
    if retry.exhausted(failures) {
        error!(job = %key, %error, failures, "giving up on job after repeated failures");
        ctx.failures.remove(&key);
        return Action::await_change();
    }

    let delay = retry.delay_for(failures);
    warn!(
        job = %key,
        %error,
        failures,
        delay_ms = delay.as_millis() as u64,
        "reconciliation failed, retrying"
    );
    Action::requeue(delay)
}
