//! Live node and pod view
//!
//! Node occupancy is read through from the API server on every request; none
//! of it is cached here.

use async_trait::async_trait;
use batchjob_common::Error;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::api::{Api, ListParams};
use kube::{Client, ResourceExt};
#[cfg(test)]
use mockall::automock;

use crate::types::{NodeOccupancy, PodDescription};

/// Read-only view of the cluster's nodes and bound pods
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterView: Send + Sync {
    /// Names of all nodes
    async fn node_names(&self) -> Result<Vec<String>, Error>;

    /// Pods bound to a node and not yet finished
    async fn scheduled_pods(&self) -> Result<Vec<PodDescription>, Error>;
}

/// Group pods by node. Every known node gets an entry, even with no pods.
pub async fn node_occupancy(cluster: &dyn ClusterView) -> Result<NodeOccupancy, Error> {
    let mut occupancy: NodeOccupancy = cluster
        .node_names()
        .await?
        .into_iter()
        .map(|name| (name, Vec::new()))
        .collect();
    for pod in cluster.scheduled_pods().await? {
        occupancy.entry(pod.node_name.clone()).or_default().push(pod);
    }
    Ok(occupancy)
}

/// [`ClusterView`] backed by the Kubernetes API
pub struct KubeClusterView {
    client: Client,
}

impl KubeClusterView {
    /// Wrap a kube client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterView for KubeClusterView {
    async fn node_names(&self) -> Result<Vec<String>, Error> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        let list = nodes.list(&ListParams::default()).await?;
        Ok(list.items.iter().map(|n| n.name_any()).collect())
    }

    async fn scheduled_pods(&self) -> Result<Vec<PodDescription>, Error> {
        let pods: Api<Pod> = Api::all(self.client.clone());
        let params = ListParams::default()
            .fields("spec.nodeName!=,status.phase!=Succeeded,status.phase!=Failed");
        let list = pods.list(&params).await?;
        Ok(list
            .items
            .iter()
            .filter_map(|pod| {
                let node_name = pod.spec.as_ref()?.node_name.clone()?;
                Some(PodDescription {
                    pod_name: pod.name_any(),
                    node_name,
                })
            })
            .collect())
    }
}
