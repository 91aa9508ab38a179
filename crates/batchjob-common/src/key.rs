//! Job identity
//!
//! A BatchJob is identified by its namespace and name. The same pair names
//! its queue entry and the SparkApplication created for it.

use std::fmt;

use kube::runtime::reflector::ObjectRef;
use kube::{Resource, ResourceExt};
use serde::{Deserialize, Serialize};

use crate::crd::BatchJob;

/// Namespaced identity of a BatchJob.
///
/// Serializes as `{"name": ..., "namespace": ...}`. The capitalized
/// `Name`/`Namespace` spelling is accepted on input as well.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobKey {
    /// Object name
    #[serde(alias = "Name")]
    pub name: String,
    /// Object namespace
    #[serde(alias = "Namespace")]
    pub namespace: String,
}

impl JobKey {
    /// Create a key from namespace and name
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Key of an existing object, falling back to `default` for cluster-scoped reads
    pub fn of<K: Resource>(obj: &K) -> Self {
        Self {
            name: obj.name_any(),
            namespace: obj.namespace().unwrap_or_else(|| "default".to_string()),
        }
    }

    /// Controller work-queue reference for this job
    pub fn object_ref(&self) -> ObjectRef<BatchJob> {
        ObjectRef::new(&self.name).within(&self.namespace)
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl From<&ObjectRef<BatchJob>> for JobKey {
    fn from(obj: &ObjectRef<BatchJob>) -> Self {
        Self {
            name: obj.name.clone(),
            namespace: obj.namespace.clone().unwrap_or_else(|| "default".to_string()),
        }
    }
}
