//! Operator wired over in-memory stores
//!
//! Watch events are simulated by calling `reconcile` explicitly with the
//! store's current copy of the job.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use batchjob_common::crd::{BatchJob, BatchJobSpec, JobState};
use batchjob_common::events::NoopEventPublisher;
use batchjob_common::JobKey;
use batchjob_controller::{reconcile, Context, ControllerConfig};
use batchjob_extender::{router, ApiState, ExtenderConfig};
use kube::runtime::controller::Action;
use tower::ServiceExt;

use super::memory::{MemoryJobStore, MemorySparkStore, StaticCluster};

pub struct Harness {
    pub jobs: Arc<MemoryJobStore>,
    pub sparks: Arc<MemorySparkStore>,
    pub ctx: Arc<Context>,
    pub app: Router,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ControllerConfig::default())
    }

    pub fn with_config(config: ControllerConfig) -> Self {
        Self::over(
            Arc::new(MemoryJobStore::default()),
            Arc::new(MemorySparkStore::default()),
            config,
        )
    }

    /// A fresh operator process over existing cluster state
    pub fn restarted(&self) -> Self {
        Self::over(
            self.jobs.clone(),
            self.sparks.clone(),
            self.ctx.config.clone(),
        )
    }

    fn over(
        jobs: Arc<MemoryJobStore>,
        sparks: Arc<MemorySparkStore>,
        config: ControllerConfig,
    ) -> Self {
        let ctx = Arc::new(Context::new(
            jobs.clone(),
            sparks.clone(),
            Arc::new(NoopEventPublisher),
            config,
        ));
        let app = router(ApiState {
            ctx: ctx.clone(),
            cluster: Arc::new(StaticCluster(vec!["n1".to_string(), "n2".to_string()])),
            config: ExtenderConfig::default(),
        });
        Self {
            jobs,
            sparks,
            ctx,
            app,
        }
    }

    /// Create a job and let the reconciler admit it
    pub async fn submit(&self, name: &str, note: Option<&str>) -> JobKey {
        let mut job = BatchJob::new(
            name,
            BatchJobSpec {
                note: note.map(str::to_string),
                ..Default::default()
            },
        );
        job.metadata.namespace = Some("default".to_string());
        let key = self.jobs.create(job);

        // First pass adds the finalizer, second one queues
        self.reconcile(&key).await;
        self.reconcile(&key).await;
        key
    }

    /// Deliver a watch event for the job
    pub async fn reconcile(&self, key: &JobKey) -> Action {
        let job = self
            .jobs
            .snapshot(key)
            .unwrap_or_else(|| panic!("job {key} should exist"));
        reconcile(Arc::new(job), self.ctx.clone())
            .await
            .expect("reconcile should succeed")
    }

    pub fn state(&self, key: &JobKey) -> Option<JobState> {
        self.jobs.snapshot(key).and_then(|j| j.state())
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let body = if body.is_null() {
            Body::empty()
        } else {
            Body::from(body.to_string())
        };
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body)
            .expect("request building should succeed");
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("request should succeed");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body reading should succeed");
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    pub async fn schedule(&self, node: &str, names: &[&str]) -> serde_json::Value {
        let keys: Vec<_> = names
            .iter()
            .map(|n| serde_json::json!({"name": n, "namespace": "default"}))
            .collect();
        let (status, body) = self
            .request("POST", "/schedule", serde_json::json!({ node: keys }))
            .await;
        assert_eq!(status, StatusCode::OK);
        body
    }

    pub async fn queued_names(&self) -> Vec<String> {
        let (status, body) = self.request("GET", "/queue", serde_json::Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        body.as_array()
            .expect("queue should be an array")
            .iter()
            .map(|d| d["jobName"]["name"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    /// A job is queued exactly when it is InQueue
    pub fn assert_queue_consistent(&self, key: &JobKey) {
        assert_eq!(
            self.ctx.queue.contains(key),
            self.state(key) == Some(JobState::InQueue),
            "queue membership of {key} disagrees with state {:?}",
            self.state(key)
        );
    }
}
