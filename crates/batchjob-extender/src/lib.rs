//! Scheduler-extender and placement HTTP API
//!
//! Bridges an external placement agent and kube-scheduler into the BatchJob
//! reconciler: the agent reads the queue and node occupancy and posts
//! placement decisions, while kube-scheduler asks the filter and prioritize
//! endpoints to keep each pod on the node its job was placed on.

#![deny(missing_docs)]

pub mod error;
pub mod nodes;
pub mod policy;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use nodes::{ClusterView, KubeClusterView};
pub use policy::UnplacedPodPolicy;
pub use server::{router, start_server, ApiState, ExtenderConfig};
