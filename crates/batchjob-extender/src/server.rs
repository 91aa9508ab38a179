//! Extender HTTP server
//!
//! - `GET /queue` lists jobs awaiting placement, oldest first
//! - `GET /nodes` reports the pods bound to each node
//! - `POST /schedule` places jobs on the nodes an external agent picked
//! - `POST /extender/filter` and `POST /extender/prioritize` implement the
//!   kube-scheduler extender protocol over those placements
//!
//! Bodies are parsed by hand from raw bytes so that every malformed payload is
//! a 400 with a JSON error, and an empty body counts as empty extender args.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use batchjob_common::Error;
use batchjob_controller::{Context, JobDescription};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::nodes::{node_occupancy, ClusterView};
use crate::policy::{filter_nodes, prioritize_nodes, UnplacedPodPolicy};
use crate::types::{
    ExtenderArgs, ExtenderFilterResult, HostPriority, NodeList, NodeOccupancy, PlacementDecision,
    PlacementOutcome, PlacementResult,
};

/// Extender settings
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtenderConfig {
    /// Eligibility of pods without a placement decision
    pub unplaced_pod_policy: UnplacedPodPolicy,
}

/// Shared state for handlers
#[derive(Clone)]
pub struct ApiState {
    /// Reconciler context owning the queue and the placement path
    pub ctx: Arc<Context>,
    /// Live cluster view for node occupancy
    pub cluster: Arc<dyn ClusterView>,
    /// Extender settings
    pub config: ExtenderConfig,
}

/// Build the router
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/queue", get(list_queue))
        .route("/nodes", get(list_nodes))
        .route("/schedule", post(schedule))
        .route("/extender/filter", post(filter))
        .route("/extender/prioritize", post(prioritize))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
}

/// Serve the API on `addr` until `shutdown` resolves
pub async fn start_server(
    addr: SocketAddr,
    state: ApiState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), Error> {
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        Error::internal_with_context("extender", format!("failed to bind {addr}: {e}"))
    })?;
    info!(addr = %addr, "Extender API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::internal_with_context("extender", format!("server error: {e}")))
}

fn parse<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("malformed request body: {e}")))
}

async fn list_queue(State(state): State<ApiState>) -> Json<Vec<JobDescription>> {
    Json(state.ctx.queue.list())
}

async fn list_nodes(State(state): State<ApiState>) -> Result<Json<NodeOccupancy>, ApiError> {
    Ok(Json(node_occupancy(state.cluster.as_ref()).await?))
}

/// Place every listed job; one job's failure does not affect the others
async fn schedule(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<Json<Vec<PlacementOutcome>>, ApiError> {
    let decision: PlacementDecision = parse(&body)?;

    let placements = decision.into_iter().flat_map(|(node, keys)| {
        keys.into_iter().map(move |key| (node.clone(), key))
    });
    let outcomes = futures::future::join_all(placements.map(|(node, key)| {
        let ctx = state.ctx.clone();
        async move {
            let (result, message) = match ctx.place(&key, &node).await {
                Ok(()) => (PlacementResult::Submitted, None),
                Err(e) if e.is_not_found() => (PlacementResult::NotFound, Some(e.to_string())),
                Err(e) => (PlacementResult::Failed, Some(e.to_string())),
            };
            PlacementOutcome {
                job_name: key,
                node,
                result,
                message,
            }
        }
    }))
    .await;

    let submitted = outcomes
        .iter()
        .filter(|o| o.result == PlacementResult::Submitted)
        .count();
    if submitted < outcomes.len() {
        warn!(submitted, total = outcomes.len(), "placement partially applied");
    } else {
        debug!(submitted, "placement applied");
    }
    Ok(Json(outcomes))
}

async fn filter(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<Json<ExtenderFilterResult>, ApiError> {
    let args: ExtenderArgs = parse(&body)?;
    let decision = filter_nodes(
        args.desired_node(),
        &args.candidate_names(),
        state.config.unplaced_pod_policy,
    );

    // Answer in the form the scheduler asked in
    let mut result = ExtenderFilterResult {
        failed_nodes: decision.failed,
        ..Default::default()
    };
    match args.nodes {
        Some(list) if args.nodenames.is_none() => {
            let items = list
                .items
                .into_iter()
                .filter(|n| decision.feasible.iter().any(|f| f == n.name()))
                .collect();
            result.nodes = Some(NodeList {
                items,
                rest: list.rest,
            });
        }
        _ => result.nodenames = Some(decision.feasible),
    }
    Ok(Json(result))
}

async fn prioritize(
    State(_state): State<ApiState>,
    body: Bytes,
) -> Result<Json<Vec<HostPriority>>, ApiError> {
    let args: ExtenderArgs = parse(&body)?;
    Ok(Json(prioritize_nodes(
        args.desired_node(),
        &args.candidate_names(),
    )))
}
