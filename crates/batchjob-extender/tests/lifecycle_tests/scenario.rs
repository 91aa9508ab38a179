//! A job's life from creation to deletion

use batchjob_common::crd::{EngineState, JobState, SparkRole};
use batchjob_common::{DESIRED_NODE_ANNOTATION, EXECUTOR_POD_LABEL, JOB_NAME_LABEL};
use batchjob_controller::ControllerConfig;
use kube::runtime::controller::Action;

use super::harness::Harness;

#[tokio::test]
async fn story_job_is_queued_placed_and_completes() {
    let h = Harness::new();

    // A user creates j1 and the operator queues it
    let key = h.submit("j1", Some("SomeThing")).await;
    assert_eq!(h.state(&key), Some(JobState::InQueue));
    assert_eq!(h.queued_names().await, ["j1"]);
    h.assert_queue_consistent(&key);

    // The placement agent puts it on n1
    let outcomes = h.schedule("n1", &["j1"]).await;
    assert_eq!(outcomes[0]["result"], "Submitted");

    let app = h.sparks.app(&key).expect("SparkApplication should exist");
    for role in [SparkRole::Driver, SparkRole::Executor] {
        let pod = app.spec.role(role);
        assert_eq!(pod.annotations[DESIRED_NODE_ANNOTATION], "n1");
        assert_eq!(pod.labels[JOB_NAME_LABEL], "j1");
        assert_eq!(pod.scheduler_name.as_deref(), Some("batchjob-scheduler"));
    }
    assert_eq!(app.spec.executor.pod.labels[EXECUTOR_POD_LABEL], "true");
    assert!(!app.spec.driver.pod.labels.contains_key(EXECUTOR_POD_LABEL));

    assert!(h.queued_names().await.is_empty());
    assert_eq!(h.state(&key), Some(JobState::Submitted));
    h.assert_queue_consistent(&key);

    // The engine has not reported yet; nothing moves
    h.reconcile(&key).await;
    assert_eq!(h.state(&key), Some(JobState::Submitted));

    // The Spark operator drives the application to completion
    for (engine, expected) in [
        (EngineState::Submitted, JobState::Submitted),
        (EngineState::Running, JobState::Running),
        (EngineState::Completed, JobState::Completed),
    ] {
        h.sparks.set_state(&key, engine, None);
        h.reconcile(&key).await;
        assert_eq!(h.state(&key), Some(expected));
        h.assert_queue_consistent(&key);
    }

    // Completed jobs wait for the next change rather than polling
    assert_eq!(h.reconcile(&key).await, Action::await_change());

    // The job-specific field survived every transition
    let job = h.jobs.snapshot(&key).unwrap();
    assert_eq!(job.spec.note.as_deref(), Some("SomeThing"));
}

#[tokio::test]
async fn story_engine_failure_is_reported_on_the_job() {
    let h = Harness::new();
    let key = h.submit("j1", None).await;
    h.schedule("n2", &["j1"]).await;

    h.sparks.set_state(&key, EngineState::Running, None);
    h.reconcile(&key).await;
    h.sparks
        .set_state(&key, EngineState::Failed, Some("driver pod OOMKilled"));
    h.reconcile(&key).await;

    let job = h.jobs.snapshot(&key).unwrap();
    let status = job.status.unwrap();
    assert_eq!(status.state, JobState::Failed);
    assert_eq!(status.error.as_deref(), Some("driver pod OOMKilled"));
}

#[tokio::test]
async fn story_unknown_engine_states_do_not_advance_the_job() {
    let h = Harness::new();
    let key = h.submit("j1", None).await;
    h.schedule("n1", &["j1"]).await;

    for other in ["PENDING_RERUN", "INVALIDATING", "SUCCEEDING"] {
        h.sparks
            .set_state(&key, EngineState::Other(other.to_string()), None);
        h.reconcile(&key).await;
        assert_eq!(h.state(&key), Some(JobState::Submitted), "{other}");
    }
}

#[tokio::test]
async fn story_vanished_application_fails_the_job() {
    let h = Harness::new();
    let key = h.submit("j1", None).await;
    h.schedule("n1", &["j1"]).await;
    h.sparks.set_state(&key, EngineState::Running, None);
    h.reconcile(&key).await;

    h.sparks.vanish(&key);
    h.reconcile(&key).await;

    let status = h.jobs.snapshot(&key).unwrap().status.unwrap();
    assert_eq!(status.state, JobState::Failed);
    assert!(status.error.is_some());
}

#[tokio::test]
async fn story_deleting_a_running_job_removes_its_application() {
    let h = Harness::new();
    let key = h.submit("j1", None).await;
    h.schedule("n1", &["j1"]).await;
    h.sparks.set_state(&key, EngineState::Running, None);
    h.reconcile(&key).await;

    h.jobs.delete(&key);
    assert!(h.jobs.snapshot(&key).is_some(), "finalizer holds the job");
    h.reconcile(&key).await;

    assert!(h.sparks.app(&key).is_none());
    assert!(h.jobs.snapshot(&key).is_none());
}

#[tokio::test]
async fn story_deleting_a_queued_job_drops_its_entry() {
    let h = Harness::new();
    let key = h.submit("j1", None).await;
    assert_eq!(h.queued_names().await, ["j1"]);

    h.jobs.delete(&key);
    h.reconcile(&key).await;

    assert!(h.queued_names().await.is_empty());
    assert!(h.jobs.snapshot(&key).is_none());

    // A late placement for it finds nothing
    let outcomes = h.schedule("n1", &["j1"]).await;
    assert_eq!(outcomes[0]["result"], "NotFound");
    assert_eq!(h.sparks.create_count(), 0);
}

#[tokio::test]
async fn story_operator_restart_rebuilds_the_queue() {
    let h = Harness::new();
    let queued = h.submit("j1", None).await;
    let placed = h.submit("j2", None).await;
    h.schedule("n1", &["j2"]).await;

    // The queue lives in memory only
    let restarted = h.restarted();
    assert!(restarted.queued_names().await.is_empty());

    // The initial watch list replays every job
    restarted.reconcile(&queued).await;
    restarted.reconcile(&placed).await;

    assert_eq!(restarted.queued_names().await, ["j1"]);
    restarted.assert_queue_consistent(&queued);
    restarted.assert_queue_consistent(&placed);
}

#[tokio::test]
async fn story_status_conflicts_are_retried() {
    let h = Harness::with_config(ControllerConfig {
        status_update_attempts: 5,
        ..Default::default()
    });
    let key = h.submit("j1", None).await;

    // Two lost races, then the write lands
    h.jobs.inject_conflicts(2);
    let outcomes = h.schedule("n1", &["j1"]).await;
    assert_eq!(outcomes[0]["result"], "Submitted");
    assert_eq!(h.state(&key), Some(JobState::Submitted));
}

#[tokio::test]
async fn story_lost_submitted_write_is_recovered_by_mirroring() {
    let h = Harness::with_config(ControllerConfig {
        status_update_attempts: 2,
        ..Default::default()
    });
    let key = h.submit("j1", None).await;

    // Every attempt to record Submitted loses; the application exists anyway
    h.jobs.inject_conflicts(2);
    let outcomes = h.schedule("n1", &["j1"]).await;
    assert_eq!(outcomes[0]["result"], "Submitted");
    assert_eq!(h.state(&key), Some(JobState::InQueue));
    assert!(h.queued_names().await.is_empty());

    // The engine's first report brings the job in line
    h.sparks.set_state(&key, EngineState::Submitted, None);
    h.reconcile(&key).await;
    assert_eq!(h.state(&key), Some(JobState::Submitted));
    h.assert_queue_consistent(&key);
}

#[tokio::test]
async fn story_lost_submitted_write_is_recovered_while_engine_is_silent() {
    let h = Harness::with_config(ControllerConfig {
        status_update_attempts: 1,
        ..Default::default()
    });
    let key = h.submit("j1", None).await;

    // The only attempt to record Submitted loses
    h.jobs.inject_conflicts(1);
    assert_eq!(h.schedule("n1", &["j1"]).await[0]["result"], "Submitted");
    assert_eq!(h.state(&key), Some(JobState::InQueue));

    // The Spark operator has not reported anything yet
    h.reconcile(&key).await;
    assert_eq!(h.state(&key), Some(JobState::Submitted));
    assert!(h.queued_names().await.is_empty());
    h.assert_queue_consistent(&key);
    assert_eq!(h.sparks.create_count(), 1);
}
