//! kube-scheduler's view of placed jobs

use axum::http::StatusCode;
use batchjob_common::crd::SparkRole;

use super::harness::Harness;

/// Extender args for a pod built from a role template of the job's application
fn args_for_pod(annotations: &std::collections::BTreeMap<String, String>) -> serde_json::Value {
    serde_json::json!({
        "pod": {"metadata": {"name": "j1-exec-1", "annotations": annotations}},
        "nodenames": ["n1", "n2"]
    })
}

#[tokio::test]
async fn executor_pods_are_held_to_the_placed_node() {
    let h = Harness::new();
    let key = h.submit("j1", None).await;
    h.schedule("n2", &["j1"]).await;
    let app = h.sparks.app(&key).unwrap();
    let annotations = &app.spec.role(SparkRole::Executor).annotations;

    let (status, filtered) = h
        .request("POST", "/extender/filter", args_for_pod(annotations))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(filtered["nodenames"], serde_json::json!(["n2"]));
    assert!(filtered["failedNodes"]["n1"].is_string());

    let (status, scores) = h
        .request("POST", "/extender/prioritize", args_for_pod(annotations))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        scores,
        serde_json::json!([{"host": "n1", "score": 0}, {"host": "n2", "score": 10}])
    );
}

#[tokio::test]
async fn foreign_pods_and_empty_lists_get_well_formed_answers() {
    let h = Harness::new();

    let foreign = serde_json::json!({"pod": {"metadata": {"name": "nginx"}}, "nodenames": ["n1"]});
    let (status, filtered) = h.request("POST", "/extender/filter", foreign).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(filtered["nodenames"], serde_json::json!(["n1"]));

    let empty = serde_json::json!({"pod": {"metadata": {"name": "nginx"}}, "nodenames": []});
    let (status, filtered) = h.request("POST", "/extender/filter", empty.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(filtered["nodenames"], serde_json::json!([]));

    let (status, scores) = h.request("POST", "/extender/prioritize", empty).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(scores, serde_json::json!([]));
}

#[tokio::test]
async fn node_view_lists_every_node() {
    let h = Harness::new();
    let (status, nodes) = h.request("GET", "/nodes", serde_json::Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(nodes, serde_json::json!({"n1": [], "n2": []}));
}
