//! Collaborator traits consumed by the cleaner.

use async_trait::async_trait;

use podsweep_core::{LabelSelector, WorkloadInstance};

use crate::error::ClusterResult;

/// Read side: a locally queryable mirror of the cluster's pods.
///
/// Reads may lag the API server. Implementations must be cheap to call
/// repeatedly; the cleaner re-reads before every delete.
pub trait PodCache: Send + Sync {
    /// All pods across namespaces matching `selector`.
    fn list(&self, selector: &LabelSelector) -> ClusterResult<Vec<WorkloadInstance>>;

    /// Pods in `namespace` matching `selector`.
    fn list_namespaced(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> ClusterResult<Vec<WorkloadInstance>>;

    /// A single pod, or `None` if the cache no longer has it.
    fn get(&self, namespace: &str, name: &str) -> ClusterResult<Option<WorkloadInstance>>;

    /// Whether the initial listing has been loaded.
    fn has_synced(&self) -> bool;
}

/// Write side: pod deletion.
#[async_trait]
pub trait PodMutator: Send + Sync {
    /// Delete a pod. Returns [`ClusterError::NotFound`](crate::ClusterError::NotFound)
    /// if it was already gone.
    async fn delete(&self, namespace: &str, name: &str) -> ClusterResult<()>;
}
