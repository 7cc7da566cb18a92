//! Kubernetes adapters.
//!
//! [`KubePodCache`] is a thin read view over a `kube` reflector store. The
//! store is fed by a background watch task started with
//! [`KubePodCache::start`]; the cleaner only ever reads from it.
//! [`KubePodMutator`] deletes pods through the API server.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, DeleteParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::runtime::reflector::{self, ObjectRef, Store};
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Client, Config};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use podsweep_core::{LabelSelector, WorkloadInstance};

use crate::cache::{PodCache, PodMutator};
use crate::convert::pod_to_instance;
use crate::error::{ClusterError, ClusterResult};

/// Build a client from an explicit kubeconfig, or infer one
/// (in-cluster service account, `$KUBECONFIG`, `~/.kube/config`).
///
/// `master` overrides the API server URL from the kubeconfig.
pub async fn build_client(kubeconfig: Option<&Path>, master: Option<&str>) -> ClusterResult<Client> {
    let mut config = match kubeconfig {
        Some(path) => {
            let kc = Kubeconfig::read_from(path)
                .map_err(|e| ClusterError::Config(format!("{}: {e}", path.display())))?;
            Config::from_custom_kubeconfig(kc, &KubeConfigOptions::default())
                .await
                .map_err(|e| ClusterError::Config(e.to_string()))?
        }
        None => Config::infer()
            .await
            .map_err(|e| ClusterError::Config(e.to_string()))?,
    };

    if let Some(master) = master.filter(|m| !m.is_empty()) {
        config.cluster_url = master
            .parse::<http::Uri>()
            .map_err(|e| ClusterError::Config(format!("invalid API server url {master}: {e}")))?;
    }

    debug!(cluster_url = %config.cluster_url, "kubernetes client configured");
    Client::try_from(config).map_err(|e| ClusterError::Config(e.to_string()))
}

/// Pod cache backed by a reflector store over all namespaces.
#[derive(Clone)]
pub struct KubePodCache {
    store: Store<Pod>,
    synced: Arc<AtomicBool>,
}

impl KubePodCache {
    /// Start watching pods cluster-wide.
    ///
    /// Returns the cache and the handle of the watch task. The task runs
    /// until `shutdown` flips to `true` (or its sender is dropped).
    pub fn start(client: Client, mut shutdown: watch::Receiver<bool>) -> (Self, JoinHandle<()>) {
        let api: Api<Pod> = Api::all(client);
        let (reader, writer) = reflector::store();
        let synced = Arc::new(AtomicBool::new(false));

        let ready_reader = reader.clone();
        let ready_flag = synced.clone();
        tokio::spawn(async move {
            if ready_reader.wait_until_ready().await.is_ok() {
                ready_flag.store(true, Ordering::Release);
                info!(pods = ready_reader.state().len(), "pod cache synced");
            }
        });

        let stream = watcher(api, watcher::Config::default())
            .default_backoff()
            .reflect(writer)
            .touched_objects();

        let handle = tokio::spawn(async move {
            let mut stream = std::pin::pin!(stream);
            info!("pod watch started");

            loop {
                tokio::select! {
                    event = stream.next() => match event {
                        Some(Ok(_)) => {}
                        Some(Err(e)) => warn!(error = %e, "pod watch error"),
                        None => {
                            warn!("pod watch stream ended");
                            break;
                        }
                    },
                    _ = shutdown.wait_for(|&stop| stop) => {
                        debug!("pod watch shutting down");
                        break;
                    }
                }
            }
        });

        (Self { store: reader, synced }, handle)
    }
}

impl PodCache for KubePodCache {
    fn list(&self, selector: &LabelSelector) -> ClusterResult<Vec<WorkloadInstance>> {
        Ok(self
            .store
            .state()
            .iter()
            .map(|pod| pod_to_instance(pod))
            .filter(|inst| selector.matches(&inst.labels))
            .collect())
    }

    fn list_namespaced(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> ClusterResult<Vec<WorkloadInstance>> {
        Ok(self
            .store
            .state()
            .iter()
            .filter(|pod| pod.metadata.namespace.as_deref() == Some(namespace))
            .map(|pod| pod_to_instance(pod))
            .filter(|inst| selector.matches(&inst.labels))
            .collect())
    }

    fn get(&self, namespace: &str, name: &str) -> ClusterResult<Option<WorkloadInstance>> {
        let obj_ref = ObjectRef::<Pod>::new(name).within(namespace);
        Ok(self.store.get(&obj_ref).map(|pod| pod_to_instance(&pod)))
    }

    fn has_synced(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }
}

/// Deletes pods through the API server with default delete options.
#[derive(Clone)]
pub struct KubePodMutator {
    client: Client,
}

impl KubePodMutator {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PodMutator for KubePodMutator {
    async fn delete(&self, namespace: &str, name: &str) -> ClusterResult<()> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        match api.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(resp)) if resp.code == 404 => {
                Err(ClusterError::not_found(namespace, name))
            }
            Err(e) => Err(ClusterError::Api(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pod(namespace: &str, name: &str, app: &str, phase: &str) -> Pod {
        serde_json::from_value(serde_json::json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {
                "name": name,
                "namespace": namespace,
                "uid": format!("uid-{namespace}-{name}"),
                "labels": { "app": app }
            },
            "status": { "phase": phase }
        }))
        .unwrap()
    }

    /// Cache over a store that has completed its initial listing of `pods`.
    fn synced_cache(pods: Vec<Pod>) -> KubePodCache {
        let (reader, mut writer) = reflector::store::<Pod>();
        writer.apply_watcher_event(&watcher::Event::Init);
        for pod in pods {
            writer.apply_watcher_event(&watcher::Event::InitApply(pod));
        }
        writer.apply_watcher_event(&watcher::Event::InitDone);

        KubePodCache {
            store: reader,
            synced: Arc::new(AtomicBool::new(true)),
        }
    }

    fn app(value: &str) -> LabelSelector {
        let mut labels = podsweep_core::Labels::new();
        labels.insert("app".to_string(), value.to_string());
        LabelSelector::from_labels(&labels)
    }

    #[test]
    fn list_spans_namespaces() {
        let cache = synced_cache(vec![
            pod("default", "a", "x", "Failed"),
            pod("other", "b", "x", "Running"),
            pod("default", "c", "y", "Running"),
        ]);

        assert_eq!(cache.list(&LabelSelector::everything()).unwrap().len(), 3);

        let mut names: Vec<String> = cache
            .list(&app("x"))
            .unwrap()
            .into_iter()
            .map(|p| p.key())
            .collect();
        names.sort();
        assert_eq!(names, vec!["default/a", "other/b"]);
    }

    #[test]
    fn list_namespaced_filters_namespace_and_labels() {
        let cache = synced_cache(vec![
            pod("default", "a", "x", "Failed"),
            pod("other", "b", "x", "Running"),
            pod("default", "c", "y", "Running"),
        ]);

        let pods = cache.list_namespaced("default", &app("x")).unwrap();
        assert_eq!(pods.len(), 1);
        assert_eq!(pods[0].name, "a");
        assert_eq!(pods[0].phase, "Failed");

        assert!(cache.list_namespaced("missing", &app("x")).unwrap().is_empty());
    }

    #[test]
    fn get_is_namespace_scoped() {
        let cache = synced_cache(vec![
            pod("default", "a", "x", "Failed"),
            pod("other", "b", "x", "Running"),
        ]);

        let hit = cache.get("default", "a").unwrap().unwrap();
        assert_eq!(hit.uid, "uid-default-a");
        assert!(cache.get("other", "a").unwrap().is_none());
        assert!(cache.get("default", "ghost").unwrap().is_none());
    }

    #[test]
    fn sync_flag_is_reported() {
        let cache = synced_cache(Vec::new());
        assert!(cache.has_synced());
        cache.synced.store(false, Ordering::Release);
        assert!(!cache.has_synced());
    }
}
