//! Policy evaluation: decides which pods are deletion candidates.
//!
//! Pure functions of (pod, policy). No I/O.

use std::collections::HashSet;
use std::time::Duration;

use crate::config::PolicyConfig;
use crate::types::WorkloadInstance;

/// Normalised, read-only view of a [`PolicyConfig`].
#[derive(Debug, Clone)]
pub struct Policy {
    excluded_namespaces: HashSet<String>,
    /// Lowercased healthy phases.
    healthy_statuses: HashSet<String>,
    check_delay: Duration,
}

impl Policy {
    pub fn new(config: &PolicyConfig) -> Self {
        Self {
            excluded_namespaces: config.excluded_namespaces.iter().cloned().collect(),
            healthy_statuses: config
                .healthy_statuses
                .iter()
                .map(|s| s.to_lowercase())
                .collect(),
            check_delay: config.check_delay(),
        }
    }

    /// Exact, case-sensitive namespace match.
    pub fn is_exempt_namespace(&self, namespace: &str) -> bool {
        self.excluded_namespaces.contains(namespace)
    }

    /// Case-insensitive phase match against the healthy set.
    pub fn is_healthy(&self, phase: &str) -> bool {
        self.healthy_statuses.contains(&phase.to_lowercase())
    }

    pub fn is_deletion_candidate(&self, instance: &WorkloadInstance) -> bool {
        !self.is_exempt_namespace(&instance.namespace) && !self.is_healthy(&instance.phase)
    }

    pub fn check_delay(&self) -> Duration {
        self.check_delay
    }
}
