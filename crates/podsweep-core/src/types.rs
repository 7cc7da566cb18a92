//! Domain types shared across podsweep crates.
//!
//! A [`WorkloadInstance`] is a read-only snapshot of a pod as seen through
//! the cluster cache. podsweep never mutates these; it only asks the
//! cluster to delete the pod they describe.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Label set attached to a pod.
pub type Labels = BTreeMap<String, String>;

/// Unique identifier the cluster assigns to each pod incarnation.
pub type InstanceUid = String;

/// Snapshot of a single pod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadInstance {
    pub namespace: String,
    pub name: String,
    pub uid: InstanceUid,
    /// Lifecycle phase: "Running", "Pending", "Failed", ...
    pub phase: String,
    /// Machine-readable reason for the current status, if any.
    pub reason: String,
    /// Human-readable status message, if any.
    pub message: String,
    /// Unix timestamp (seconds) at which the kubelet started the pod.
    pub start_time: Option<u64>,
    pub labels: Labels,
}

impl WorkloadInstance {
    /// `namespace/name` key used in logs and summaries.
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl fmt::Display for WorkloadInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Equality-based label selector.
///
/// An empty selector matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    match_labels: Labels,
}

impl LabelSelector {
    /// Selector matching every pod.
    pub fn everything() -> Self {
        Self::default()
    }

    /// Selector requiring every `key=value` pair in `labels`.
    pub fn from_labels(labels: &Labels) -> Self {
        Self {
            match_labels: labels.clone(),
        }
    }

    pub fn is_everything(&self) -> bool {
        self.match_labels.is_empty()
    }

    /// Whether `labels` carries every required pair. Extra labels are allowed.
    pub fn matches(&self, labels: &Labels) -> bool {
        self.match_labels
            .iter()
            .all(|(k, v)| labels.get(k) == Some(v))
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in &self.match_labels {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{k}={v}")?;
            first = false;
        }
        Ok(())
    }
}

/// Alert payload for a replacement pod that came back unhealthy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMessage {
    pub namespace: String,
    pub pod_name: String,
    pub phase: String,
    pub reason: String,
    pub message: String,
}

impl NotificationMessage {
    pub fn from_instance(instance: &WorkloadInstance) -> Self {
        Self {
            namespace: instance.namespace.clone(),
            pod_name: instance.name.clone(),
            phase: instance.phase.clone(),
            reason: instance.reason.clone(),
            message: instance.message.clone(),
        }
    }
}
