//! Conversion from Kubernetes `Pod` objects to [`WorkloadInstance`].

use k8s_openapi::api::core::v1::Pod;

use podsweep_core::WorkloadInstance;

/// Snapshot the fields the cleaner cares about.
///
/// Missing metadata or status fields become empty strings; a pod the
/// kubelet has not started yet has no `start_time`.
pub fn pod_to_instance(pod: &Pod) -> WorkloadInstance {
    let meta = &pod.metadata;
    let status = pod.status.as_ref();

    WorkloadInstance {
        namespace: meta.namespace.clone().unwrap_or_default(),
        name: meta.name.clone().unwrap_or_default(),
        uid: meta.uid.clone().unwrap_or_default(),
        phase: status.and_then(|s| s.phase.clone()).unwrap_or_default(),
        reason: status.and_then(|s| s.reason.clone()).unwrap_or_default(),
        message: status.and_then(|s| s.message.clone()).unwrap_or_default(),
        start_time: status
            .and_then(|s| s.start_time.as_ref())
            .and_then(|t| u64::try_from(t.0.timestamp()).ok()),
        labels: meta.labels.clone().unwrap_or_default(),
    }
}
