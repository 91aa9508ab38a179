//! Filter and prioritize decisions
//!
//! Pure functions of the pod's designated node and the candidate list. A pod
//! created from a placed BatchJob carries the desired-node annotation and is
//! feasible only there. Pods without one fall under [`UnplacedPodPolicy`].

use std::collections::BTreeMap;

use crate::types::{HostPriority, MAX_EXTENDER_PRIORITY};

/// Eligibility of pods that carry no placement decision
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnplacedPodPolicy {
    /// Feasible on every candidate
    #[default]
    AllowAll,
    /// Feasible nowhere
    DenyAll,
}

impl std::str::FromStr for UnplacedPodPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow-all" => Ok(Self::AllowAll),
            "deny-all" => Ok(Self::DenyAll),
            other => Err(format!(
                "unknown unplaced-pod policy '{other}' (expected allow-all or deny-all)"
            )),
        }
    }
}

/// Candidates split into feasible and rejected
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterDecision {
    /// Nodes the pod may run on
    pub feasible: Vec<String>,
    /// Rejected node → reason
    pub failed: BTreeMap<String, String>,
}

/// Split `candidates` for a pod designated to `desired` (if any)
pub fn filter_nodes(
    desired: Option<&str>,
    candidates: &[String],
    policy: UnplacedPodPolicy,
) -> FilterDecision {
    let mut decision = FilterDecision::default();
    for node in candidates {
        let rejection = match (desired, policy) {
            (Some(target), _) if target == node => None,
            (Some(target), _) => Some(format!("pod is placed on node {target}")),
            (None, UnplacedPodPolicy::AllowAll) => None,
            (None, UnplacedPodPolicy::DenyAll) => Some("pod has no placement decision".to_string()),
        };
        match rejection {
            None => decision.feasible.push(node.clone()),
            Some(reason) => {
                decision.failed.insert(node.clone(), reason);
            }
        }
    }
    decision
}

/// Score `candidates`: the designated node gets the maximum, the rest zero
pub fn prioritize_nodes(desired: Option<&str>, candidates: &[String]) -> Vec<HostPriority> {
    candidates
        .iter()
        .map(|node| HostPriority {
            host: node.clone(),
            score: if desired == Some(node.as_str()) {
                MAX_EXTENDER_PRIORITY
            } else {
                0
            },
        })
        .collect()
}
