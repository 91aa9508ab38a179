//! Placement requests from the external agent

use std::sync::Arc;

use axum::http::StatusCode;
use batchjob_common::crd::JobState;
use batchjob_controller::{ControllerConfig, FailedSubmissionPolicy};

use super::harness::Harness;

#[tokio::test]
async fn one_bad_job_does_not_block_the_others() {
    let h = Harness::new();
    let a = h.submit("a", None).await;
    let b = h.submit("b", None).await;

    let (status, outcomes) = h
        .request(
            "POST",
            "/schedule",
            serde_json::json!({
                "n1": [
                    {"name": "a", "namespace": "default"},
                    {"name": "ghost", "namespace": "default"}
                ],
                "n2": [{"name": "b", "namespace": "default"}]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let results: Vec<_> = outcomes
        .as_array()
        .unwrap()
        .iter()
        .map(|o| {
            (
                o["jobName"]["name"].as_str().unwrap().to_string(),
                o["result"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    assert_eq!(
        results,
        [
            ("a".to_string(), "Submitted".to_string()),
            ("ghost".to_string(), "NotFound".to_string()),
            ("b".to_string(), "Submitted".to_string()),
        ]
    );
    assert_eq!(h.sparks.app(&a).unwrap().desired_node(), Some("n1"));
    assert_eq!(h.sparks.app(&b).unwrap().desired_node(), Some("n2"));
}

#[tokio::test]
async fn placing_a_job_twice_submits_it_once() {
    let h = Harness::new();
    h.submit("j1", None).await;

    assert_eq!(h.schedule("n1", &["j1"]).await[0]["result"], "Submitted");
    assert_eq!(h.schedule("n2", &["j1"]).await[0]["result"], "NotFound");
    assert_eq!(h.sparks.create_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_placements_create_exactly_one_application() {
    let h = Arc::new(Harness::new());
    let key = h.submit("j1", None).await;

    let requests: Vec<_> = (0..8)
        .map(|i| {
            let h = h.clone();
            tokio::spawn(async move {
                let outcomes = h.schedule(&format!("n{}", i % 2 + 1), &["j1"]).await;
                outcomes[0]["result"].as_str().unwrap().to_string()
            })
        })
        .collect();

    let mut results = Vec::new();
    for r in requests {
        results.push(r.await.unwrap());
    }
    assert_eq!(results.iter().filter(|r| *r == "Submitted").count(), 1);
    assert_eq!(results.iter().filter(|r| *r == "NotFound").count(), 7);
    assert_eq!(h.sparks.create_count(), 1);
    assert_eq!(h.state(&key), Some(JobState::Submitted));
}

#[tokio::test]
async fn rejected_submission_is_terminal_by_default() {
    let h = Harness::new();
    let key = h.submit("j1", None).await;

    h.sparks.reject_creates("admission webhook denied the request");
    let outcomes = h.schedule("n1", &["j1"]).await;
    assert_eq!(outcomes[0]["result"], "Failed");
    assert!(outcomes[0]["message"]
        .as_str()
        .unwrap()
        .contains("admission webhook denied"));

    let status = h.jobs.snapshot(&key).unwrap().status.unwrap();
    assert_eq!(status.state, JobState::FailedSubmission);
    assert!(status.error.unwrap().contains("admission webhook denied"));

    // Later watch events leave it alone
    h.sparks.accept_creates();
    h.reconcile(&key).await;
    assert_eq!(h.state(&key), Some(JobState::FailedSubmission));
    assert!(h.queued_names().await.is_empty());
    h.assert_queue_consistent(&key);
}

#[tokio::test]
async fn empty_node_name_is_a_failed_outcome() {
    let h = Harness::new();
    let key = h.submit("j1", None).await;

    let outcomes = h.schedule("", &["j1"]).await;
    assert_eq!(outcomes[0]["result"], "Failed");
    assert_eq!(h.state(&key), Some(JobState::InQueue));
    assert!(h.ctx.queue.contains(&key));
}

#[tokio::test]
async fn requeue_policy_returns_failed_submissions_to_the_queue() {
    let h = Harness::with_config(ControllerConfig {
        failed_submission: FailedSubmissionPolicy::Requeue,
        ..Default::default()
    });
    let key = h.submit("j1", None).await;

    h.sparks.reject_creates("quota exceeded");
    h.schedule("n1", &["j1"]).await;
    assert_eq!(h.state(&key), Some(JobState::FailedSubmission));

    // The status write triggers a reconcile, which puts the job back
    h.reconcile(&key).await;
    assert_eq!(h.state(&key), Some(JobState::InQueue));
    assert_eq!(h.queued_names().await, ["j1"]);

    // And the next placement goes through
    h.sparks.accept_creates();
    assert_eq!(h.schedule("n2", &["j1"]).await[0]["result"], "Submitted");
    assert_eq!(h.state(&key), Some(JobState::Submitted));
}
