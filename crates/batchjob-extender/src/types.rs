//! Wire types of the HTTP surface
//!
//! The extender types follow kube-scheduler's `k8s.io/kube-scheduler/extender/v1`
//! JSON layout. Pods and nodes are decoded leniently: only `metadata` is
//! interpreted, and the rest of each node object is carried through untouched
//! so a filtered `NodeList` can be handed back as received.

use std::collections::BTreeMap;

use batchjob_common::JobKey;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

/// Highest score an extender may return for a node
pub const MAX_EXTENDER_PRIORITY: i64 = 10;

/// A pod and the node it is bound to
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodDescription {
    /// Pod name
    pub pod_name: String,
    /// Node the pod is bound to
    pub node_name: String,
}

/// Node name → pods scheduled there. Every node is present, even if empty.
pub type NodeOccupancy = BTreeMap<String, Vec<PodDescription>>;

/// Node name → jobs to place there
pub type PlacementDecision = BTreeMap<String, Vec<JobKey>>;

/// Pod under consideration by kube-scheduler
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtenderPod {
    /// Name and annotations are all the extender reads
    #[serde(default)]
    pub metadata: ObjectMeta,
}

/// Candidate node, with everything but metadata kept opaque
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtenderNode {
    /// Node metadata
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// Spec, status and anything else, echoed back unchanged
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

impl ExtenderNode {
    /// Node name, empty if unset
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }
}

/// `v1.NodeList` as sent by kube-scheduler
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeList {
    /// Candidate nodes
    #[serde(default)]
    pub items: Vec<ExtenderNode>,
    /// List metadata, echoed back unchanged
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

/// Arguments of a filter or prioritize call.
///
/// kube-scheduler sends either full `nodes` or, for node-cache-capable
/// extenders, only `nodenames`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtenderArgs {
    /// Pod being scheduled
    #[serde(default)]
    pub pod: Option<ExtenderPod>,
    /// Candidates as full node objects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<NodeList>,
    /// Candidates by name, for node-cache-capable extenders
    #[serde(default, alias = "nodeNames", skip_serializing_if = "Option::is_none")]
    pub nodenames: Option<Vec<String>>,
}

impl ExtenderArgs {
    /// Names of all candidate nodes, from whichever form was sent
    pub fn candidate_names(&self) -> Vec<String> {
        match (&self.nodenames, &self.nodes) {
            (Some(names), _) => names.clone(),
            (None, Some(list)) => list.items.iter().map(|n| n.name().to_string()).collect(),
            (None, None) => Vec::new(),
        }
    }

    /// The pod's desired-node annotation, if any
    pub fn desired_node(&self) -> Option<&str> {
        self.pod
            .as_ref()?
            .metadata
            .annotations
            .as_ref()?
            .get(batchjob_common::DESIRED_NODE_ANNOTATION)
            .map(String::as_str)
    }
}

/// Result of a filter call
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtenderFilterResult {
    /// Feasible nodes, when the request carried node objects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<NodeList>,
    /// Feasible nodes by name
    #[serde(
        default,
        rename = "nodenames",
        alias = "nodeNames",
        skip_serializing_if = "Option::is_none"
    )]
    pub nodenames: Option<Vec<String>>,
    /// Rejected node → reason
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub failed_nodes: BTreeMap<String, String>,
    /// Non-empty when the whole call failed
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

/// Score of one node
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostPriority {
    /// Node name
    pub host: String,
    /// 0 to [`MAX_EXTENDER_PRIORITY`]
    pub score: i64,
}

/// What happened to one job of a placement request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementResult {
    /// SparkApplication created
    Submitted,
    /// Job was not queued (already placed, never admitted, or deleted)
    NotFound,
    /// Placement attempted and rejected
    Failed,
}

/// Per-job entry of the placement response
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementOutcome {
    /// Job the entry is about
    pub job_name: JobKey,
    /// Node it was to be placed on
    pub node: String,
    /// What happened
    pub result: PlacementResult,
    /// Error detail for `Failed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
