//! MemoryCluster: in-process pod cache and mutator.
//!
//! Implements both [`PodCache`] and [`PodMutator`] over a shared map, with
//! hooks to emulate what a real cluster does around the cleaner: a
//! controller creating a replacement when a pod is deleted, a pod
//! disappearing between listing and deletion, and API failures.
//!
//! `MemoryCluster` is `Clone`; clones share state, so a test can keep a
//! handle while the cleaner holds another.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use podsweep_core::{LabelSelector, WorkloadInstance};

use crate::cache::{PodCache, PodMutator};
use crate::error::{ClusterError, ClusterResult};

type PodKey = (String, String);

fn key(namespace: &str, name: &str) -> PodKey {
    (namespace.to_string(), name.to_string())
}

#[derive(Default)]
struct Inner {
    pods: BTreeMap<PodKey, WorkloadInstance>,
    synced: bool,
    /// Pods still returned by `list` but already gone for `get`/`delete`.
    stale: HashSet<PodKey>,
    /// Pods visible to `get` that are gone by the time `delete` runs.
    vanishing: HashSet<PodKey>,
    list_error: Option<String>,
    delete_errors: HashMap<PodKey, String>,
    /// Pods to create when the keyed pod is deleted.
    replacements: HashMap<PodKey, Vec<WorkloadInstance>>,
    deleted: Vec<String>,
    full_lists: usize,
    namespaced_lists: Vec<(String, String)>,
}

/// Shared in-memory cluster.
#[derive(Clone)]
pub struct MemoryCluster {
    inner: Arc<Mutex<Inner>>,
}

impl Default for MemoryCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCluster {
    /// An empty cluster whose cache reports itself synced.
    pub fn new() -> Self {
        let inner = Inner {
            synced: true,
            ..Inner::default()
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// An empty cluster whose cache has not synced yet.
    pub fn unsynced() -> Self {
        let cluster = Self::new();
        cluster.set_synced(false);
        cluster
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_synced(&self, synced: bool) {
        self.lock().synced = synced;
    }

    /// Insert or replace a pod.
    pub fn insert(&self, pod: WorkloadInstance) {
        let k = key(&pod.namespace, &pod.name);
        let mut inner = self.lock();
        inner.stale.remove(&k);
        inner.pods.insert(k, pod);
    }

    /// Keep the pod in listings but report it gone to `get` and `delete`.
    pub fn mark_stale(&self, namespace: &str, name: &str) {
        self.lock().stale.insert(key(namespace, name));
    }

    /// Keep the pod visible to `list` and `get`, but remove it just before
    /// `delete` so the delete reports NotFound.
    pub fn vanish_on_delete(&self, namespace: &str, name: &str) {
        self.lock().vanishing.insert(key(namespace, name));
    }

    /// Make every `list`/`list_namespaced` call fail until cleared.
    pub fn fail_list(&self, message: Option<&str>) {
        self.lock().list_error = message.map(str::to_string);
    }

    /// Make deletion of one pod fail with an API error.
    pub fn fail_delete(&self, namespace: &str, name: &str, message: &str) {
        self.lock()
            .delete_errors
            .insert(key(namespace, name), message.to_string());
    }

    /// Register pods a controller would create once `namespace/name` is deleted.
    pub fn replace_on_delete(&self, namespace: &str, name: &str, replacement: WorkloadInstance) {
        self.lock()
            .replacements
            .entry(key(namespace, name))
            .or_default()
            .push(replacement);
    }

    pub fn contains(&self, namespace: &str, name: &str) -> bool {
        self.lock().pods.contains_key(&key(namespace, name))
    }

    pub fn len(&self) -> usize {
        self.lock().pods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `namespace/name` of every successful deletion, in order.
    pub fn deleted(&self) -> Vec<String> {
        self.lock().deleted.clone()
    }

    /// Number of cluster-wide `list` calls served.
    pub fn full_list_count(&self) -> usize {
        self.lock().full_lists
    }

    /// `(namespace, selector)` of every `list_namespaced` call served.
    pub fn namespaced_lists(&self) -> Vec<(String, String)> {
        self.lock().namespaced_lists.clone()
    }
}

impl PodCache for MemoryCluster {
    fn list(&self, selector: &LabelSelector) -> ClusterResult<Vec<WorkloadInstance>> {
        let mut inner = self.lock();
        if let Some(msg) = &inner.list_error {
            return Err(ClusterError::Cache(msg.clone()));
        }
        inner.full_lists += 1;
        Ok(inner
            .pods
            .values()
            .filter(|p| selector.matches(&p.labels))
            .cloned()
            .collect())
    }

    fn list_namespaced(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> ClusterResult<Vec<WorkloadInstance>> {
        let mut inner = self.lock();
        if let Some(msg) = &inner.list_error {
            return Err(ClusterError::Cache(msg.clone()));
        }
        inner
            .namespaced_lists
            .push((namespace.to_string(), selector.to_string()));
        Ok(inner
            .pods
            .values()
            .filter(|p| p.namespace == namespace && selector.matches(&p.labels))
            .cloned()
            .collect())
    }

    fn get(&self, namespace: &str, name: &str) -> ClusterResult<Option<WorkloadInstance>> {
        let inner = self.lock();
        let k = key(namespace, name);
        if inner.stale.contains(&k) {
            return Ok(None);
        }
        Ok(inner.pods.get(&k).cloned())
    }

    fn has_synced(&self) -> bool {
        self.lock().synced
    }
}

#[async_trait]
impl PodMutator for MemoryCluster {
    async fn delete(&self, namespace: &str, name: &str) -> ClusterResult<()> {
        let mut inner = self.lock();
        let k = key(namespace, name);

        if let Some(msg) = inner.delete_errors.get(&k) {
            return Err(ClusterError::Api(msg.clone()));
        }
        if inner.stale.remove(&k) || inner.vanishing.remove(&k) {
            inner.pods.remove(&k);
            return Err(ClusterError::not_found(namespace, name));
        }
        if inner.pods.remove(&k).is_none() {
            return Err(ClusterError::not_found(namespace, name));
        }

        inner.deleted.push(format!("{namespace}/{name}"));
        if let Some(replacements) = inner.replacements.remove(&k) {
            for pod in replacements {
                debug!(namespace = %pod.namespace, name = %pod.name, "replacement pod created");
                let rk = key(&pod.namespace, &pod.name);
                inner.pods.insert(rk, pod);
            }
        }
        Ok(())
    }
}
