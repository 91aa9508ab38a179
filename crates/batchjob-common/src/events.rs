//! Kubernetes Events for BatchJob lifecycle changes
//!
//! Recording is best effort. A failed publish is logged and never fails the
//! reconcile or the placement that triggered it.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::Client;
use tracing::warn;

use crate::crd::JobState;

/// Why a BatchJob event was recorded (REASON column of `kubectl get events`)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobEventReason {
    /// Job accepted into the queue
    Queued,
    /// SparkApplication created on the designated node
    Submitted,
    /// SparkApplication creation was rejected
    SubmissionFailed,
    /// Engine reports the application running
    Running,
    /// Engine reports the application completed
    Completed,
    /// Engine reports the application failed, or it vanished
    Failed,
}

impl JobEventReason {
    /// Reason recorded when a job enters `state`
    pub fn for_state(state: JobState) -> Self {
        match state {
            JobState::InQueue => Self::Queued,
            JobState::Submitted => Self::Submitted,
            JobState::FailedSubmission => Self::SubmissionFailed,
            JobState::Running => Self::Running,
            JobState::Completed => Self::Completed,
            JobState::Failed => Self::Failed,
        }
    }

    /// Reason string as shown by kubectl
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "Queued",
            Self::Submitted => "Submitted",
            Self::SubmissionFailed => "SubmissionFailed",
            Self::Running => "Running",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }

    /// Failures surface as Warning events
    pub fn event_type(self) -> EventType {
        match self {
            Self::SubmissionFailed | Self::Failed => EventType::Warning,
            _ => EventType::Normal,
        }
    }
}

/// Which path recorded the event (ACTION column)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobEventAction {
    /// Watch-driven reconcile
    Reconcile,
    /// Placement request from the extender API
    Place,
}

impl JobEventAction {
    /// Action string as shown by kubectl
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reconcile => "Reconcile",
            Self::Place => "Place",
        }
    }
}

/// One lifecycle event on a BatchJob
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobEvent {
    /// What happened
    pub reason: JobEventReason,
    /// Which path observed it
    pub action: JobEventAction,
    /// Free-form detail, such as the node or the engine error
    pub note: Option<String>,
}

impl JobEvent {
    /// Event without a note
    pub fn new(reason: JobEventReason, action: JobEventAction) -> Self {
        Self {
            reason,
            action,
            note: None,
        }
    }

    /// Attach a human-readable note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    fn to_kube(&self) -> Event {
        Event {
            type_: self.reason.event_type(),
            reason: self.reason.as_str().to_string(),
            note: self.note.clone(),
            action: self.action.as_str().to_string(),
            secondary: None,
        }
    }
}

/// Sink for BatchJob events
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Record `event` on the job behind `job_ref`
    async fn publish(&self, job_ref: &ObjectReference, event: JobEvent);
}

/// Records events through `kube::runtime::events::Recorder`
pub struct KubeEventPublisher {
    recorder: Recorder,
}

impl KubeEventPublisher {
    /// Report as `controller_name`, with the pod name as instance when set
    pub fn new(client: Client, controller_name: &str) -> Self {
        let reporter = Reporter {
            controller: controller_name.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn publish(&self, job_ref: &ObjectReference, event: JobEvent) {
        if let Err(e) = self.recorder.publish(&event.to_kube(), job_ref).await {
            warn!(
                job = job_ref.name.as_deref().unwrap_or_default(),
                reason = event.reason.as_str(),
                error = %e,
                "failed to record event"
            );
        }
    }
}

/// Drops every event; used where no cluster is available
pub struct NoopEventPublisher;

#[async_trait]
impl EventPublisher for NoopEventPublisher {
    async fn publish(&self, _job_ref: &ObjectReference, _event: JobEvent) {}
}
