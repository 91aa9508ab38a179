//! BatchJob state machine
//!
//! Reconciliation is split into an observation of the world and a pure
//! [`transition`] function deciding what to do about it. The reconciler only
//! gathers the [`Observation`] and applies the returned [`Transition`], so
//! every rule below is testable without a cluster.
//!
//! ```text
//!   (new) ──▶ InQueue ──place──▶ Submitted ──▶ Running ──▶ Completed
//!                │                   │            │
//!                └──create fails──▶ FailedSubmission      └──▶ Failed
//! ```

use batchjob_common::crd::{BatchJob, EngineState, JobState};
use batchjob_common::BATCHJOB_FINALIZER;

use crate::store::EngineStatus;

/// Error recorded when a job's SparkApplication disappears underneath it
pub const ENGINE_GONE: &str = "SparkApplication no longer exists";

/// What to do with jobs whose submission failed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailedSubmissionPolicy {
    /// Leave the job in FailedSubmission
    #[default]
    Terminal,
    /// Put the job back in the queue for another placement
    Requeue,
}

impl std::str::FromStr for FailedSubmissionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "terminal" => Ok(Self::Terminal),
            "requeue" => Ok(Self::Requeue),
            other => Err(format!(
                "unknown failed-submission policy '{other}' (expected terminal or requeue)"
            )),
        }
    }
}

/// Tunables of the state machine
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Policy {
    /// Handling of FailedSubmission
    pub failed_submission: FailedSubmissionPolicy,
}

/// Everything the state machine looks at
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    /// Recorded job state, None for a job never seen before
    pub state: Option<JobState>,
    /// Whether the job has a deletion timestamp
    pub deleting: bool,
    /// Whether the cleanup finalizer is present
    pub has_finalizer: bool,
    /// Whether the job currently has a queue entry
    pub queued: bool,
    /// The job's SparkApplication, if one exists
    pub engine: Option<EngineStatus>,
}

impl Observation {
    /// Observe a job given its queue membership and engine status
    pub fn of(job: &BatchJob, queued: bool, engine: Option<EngineStatus>) -> Self {
        Self {
            state: job.state(),
            deleting: job.is_deleting(),
            has_finalizer: job.has_finalizer(BATCHJOB_FINALIZER),
            queued,
            engine,
        }
    }
}

/// Side effect the reconciler must carry out, in order
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Add the cleanup finalizer
    AddFinalizer,
    /// Insert the job into the queue
    Enqueue,
    /// Remove the job from the queue
    Dequeue,
    /// Delete the job's SparkApplication
    DeleteEngine,
    /// Remove the cleanup finalizer, releasing the job
    RemoveFinalizer,
}

/// Status to write
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusChange {
    /// New state
    pub state: JobState,
    /// Error to record alongside it
    pub error: Option<String>,
}

impl StatusChange {
    fn to(state: JobState) -> Self {
        Self { state, error: None }
    }
}

/// Decision for one observation
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transition {
    /// Status to write after the effects, if any
    pub next: Option<StatusChange>,
    /// Effects to apply before the status write
    pub effects: Vec<Effect>,
}

impl Transition {
    fn none() -> Self {
        Self::default()
    }

    fn effects(effects: Vec<Effect>) -> Self {
        Self {
            next: None,
            effects,
        }
    }

    fn with_status(mut self, next: StatusChange) -> Self {
        self.next = Some(next);
        self
    }
}

/// Decide the next step for a job.
///
/// Deletion wins over everything, then the finalizer is ensured, then an
/// existing SparkApplication is mirrored, and only jobs without one are
/// queued.
pub fn transition(obs: &Observation, policy: &Policy) -> Transition {
    if obs.deleting {
        if !obs.has_finalizer {
            return Transition::none();
        }
        let mut effects = vec![Effect::DeleteEngine];
        if obs.queued {
            effects.push(Effect::Dequeue);
        }
        effects.push(Effect::RemoveFinalizer);
        return Transition::effects(effects);
    }

    if !obs.has_finalizer {
        // The finalizer write triggers another reconcile that does the rest
        return Transition::effects(vec![Effect::AddFinalizer]);
    }

    match &obs.engine {
        Some(engine) => mirror_engine(obs, engine),
        None => without_engine(obs, policy),
    }
}

fn mirror_engine(obs: &Observation, engine: &EngineStatus) -> Transition {
    // A SparkApplication exists, so the job must not be placeable again
    let effects = if obs.queued {
        vec![Effect::Dequeue]
    } else {
        Vec::new()
    };
    let mut t = Transition::effects(effects);

    let Some(mapped) = engine.state.job_state() else {
        // The application was created but the Submitted write was lost
        if matches!(obs.state, None | Some(JobState::InQueue)) {
            t = t.with_status(StatusChange::to(JobState::Submitted));
        }
        return t;
    };
    if obs.state != Some(mapped) {
        let error = if engine.state == EngineState::Failed {
            engine.error.clone()
        } else {
            None
        };
        t = t.with_status(StatusChange {
            state: mapped,
            error,
        });
    }
    t
}

fn without_engine(obs: &Observation, policy: &Policy) -> Transition {
    let enqueue = || {
        if obs.queued {
            Vec::new()
        } else {
            vec![Effect::Enqueue]
        }
    };

    match obs.state {
        None => Transition::effects(enqueue()).with_status(StatusChange::to(JobState::InQueue)),
        Some(JobState::InQueue) => Transition::effects(enqueue()),
        Some(JobState::FailedSubmission) => match policy.failed_submission {
            FailedSubmissionPolicy::Terminal => Transition::none(),
            FailedSubmissionPolicy::Requeue => {
                Transition::effects(enqueue()).with_status(StatusChange::to(JobState::InQueue))
            }
        },
        Some(JobState::Submitted | JobState::Running) => {
            Transition::none().with_status(StatusChange {
                state: JobState::Failed,
                error: Some(ENGINE_GONE.to_string()),
            })
        }
        Some(JobState::Completed | JobState::Failed) => Transition::none(),
    }
}
