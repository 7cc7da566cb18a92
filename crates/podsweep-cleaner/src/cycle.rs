//! Remediation cycle: list, delete, wait, verify, notify.
//!
//! `PodCleaner::run_cycle` is stateless across calls: the set of deleted
//! pods lives only for the duration of one cycle.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::sync::watch;
use tracing::{debug, error, info};

use podsweep_cluster::{PodCache, PodMutator};
use podsweep_core::{
    InstanceUid, LabelSelector, NotificationMessage, Policy, PolicyConfig, WorkloadInstance,
};
use podsweep_notify::{LogSink, NotificationSink};

use crate::signal;

/// A replacement older than this is not considered "just restarted".
pub const NEW_INSTANCE_AGE: Duration = Duration::from_secs(10 * 60);

/// Outcome of the post-deletion verification step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// Nothing was deleted.
    NotNeeded,
    /// Shutdown arrived during the check delay.
    Cancelled,
    Completed {
        /// Distinct pods found by label lookup.
        replacements: usize,
        /// Alerts the sink accepted.
        notified: usize,
        /// Alerts the sink rejected.
        notify_failures: usize,
    },
}

/// Summary of one cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Pods returned by the initial listing.
    pub scanned: usize,
    /// `namespace/name` of each pod deleted, in deletion order.
    pub deleted: Vec<String>,
    /// Deletions rejected by the API.
    pub failed: usize,
    /// Candidates that disappeared before they could be deleted.
    pub already_gone: usize,
    pub verification: Verification,
    /// Time spent listing and deleting (excludes the check delay).
    pub elapsed: Duration,
    /// Set when the listing failed and the cycle was skipped.
    pub list_error: Option<String>,
}

impl CycleReport {
    fn new(scanned: usize) -> Self {
        Self {
            scanned,
            deleted: Vec::new(),
            failed: 0,
            already_gone: 0,
            verification: Verification::NotNeeded,
            elapsed: Duration::ZERO,
            list_error: None,
        }
    }

    fn skipped(list_error: String, elapsed: Duration) -> Self {
        Self {
            elapsed,
            list_error: Some(list_error),
            ..Self::new(0)
        }
    }
}

/// Runs remediation cycles against a pod cache and mutator.
pub struct PodCleaner {
    cache: Arc<dyn PodCache>,
    mutator: Arc<dyn PodMutator>,
    notifier: Arc<dyn NotificationSink>,
    policy: Policy,
}

impl PodCleaner {
    /// Create a cleaner that reports anomalies through [`LogSink`].
    pub fn new(
        cache: Arc<dyn PodCache>,
        mutator: Arc<dyn PodMutator>,
        config: &PolicyConfig,
    ) -> Self {
        Self {
            cache,
            mutator,
            notifier: Arc::new(LogSink::new()),
            policy: Policy::new(config),
        }
    }

    /// Replace the notification sink.
    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = notifier;
        self
    }

    pub(crate) fn cache(&self) -> &dyn PodCache {
        self.cache.as_ref()
    }

    /// Run one cycle.
    ///
    /// Never fails: listing errors skip the cycle, per-pod errors skip the
    /// pod, notification errors are logged. The returned report says what
    /// happened.
    pub async fn run_cycle(&self, shutdown: &watch::Receiver<bool>) -> CycleReport {
        debug!("cleaning cycle starting");
        let started = Instant::now();

        let pods = match self.cache.list(&LabelSelector::everything()) {
            Ok(pods) => pods,
            Err(e) => {
                error!(error = %e, "failed to list pods, skipping cycle");
                return CycleReport::skipped(e.to_string(), started.elapsed());
            }
        };

        let mut report = CycleReport::new(pods.len());
        let mut deleted: Vec<WorkloadInstance> = Vec::new();

        for pod in pods {
            if !self.policy.is_deletion_candidate(&pod) {
                continue;
            }

            info!(
                namespace = %pod.namespace,
                name = %pod.name,
                phase = %pod.phase,
                "found unhealthy pod"
            );

            // The listing may be stale by now.
            match self.cache.get(&pod.namespace, &pod.name) {
                Ok(Some(_)) => {}
                Ok(None) => {
                    debug!(namespace = %pod.namespace, name = %pod.name, "pod already gone, skipping");
                    report.already_gone += 1;
                    continue;
                }
                Err(e) => {
                    debug!(
                        namespace = %pod.namespace,
                        name = %pod.name,
                        error = %e,
                        "cache lookup failed, deleting anyway"
                    );
                }
            }

            match self.mutator.delete(&pod.namespace, &pod.name).await {
                Ok(()) => {
                    info!(namespace = %pod.namespace, name = %pod.name, "deleted pod");
                    report.deleted.push(pod.key());
                    deleted.push(pod);
                }
                Err(e) if e.is_not_found() => {
                    debug!(namespace = %pod.namespace, name = %pod.name, "pod already gone, skipping");
                    report.already_gone += 1;
                }
                Err(e) => {
                    error!(
                        namespace = %pod.namespace,
                        name = %pod.name,
                        phase = %pod.phase,
                        error = %e,
                        "failed to delete pod"
                    );
                    report.failed += 1;
                }
            }
        }

        report.elapsed = started.elapsed();
        info!(
            duration = ?report.elapsed,
            scanned = report.scanned,
            deleted = report.deleted.len(),
            failed = report.failed,
            "cleaning cycle finished"
        );

        if deleted.is_empty() {
            return report;
        }
        info!(pods = ?report.deleted, "deleted pods summary");

        let delay = self.policy.check_delay();
        info!(delay = ?delay, "waiting for pods to restart");

        let mut shutdown = shutdown.clone();
        report.verification = tokio::select! {
            biased;
            _ = signal::shutdown_requested(&mut shutdown) => {
                info!("shutdown requested, skipping verification of restarted pods");
                Verification::Cancelled
            }
            _ = tokio::time::sleep(delay) => self.verify_restarts(&deleted).await,
        };

        report
    }

    /// Find the replacements of `deleted` by label and alert on unhealthy ones.
    async fn verify_restarts(&self, deleted: &[WorkloadInstance]) -> Verification {
        info!(count = deleted.len(), "verifying restarted pods");

        // Keyed by uid so a pod matching several deleted pods is checked once.
        let mut candidates: BTreeMap<InstanceUid, WorkloadInstance> = BTreeMap::new();

        for old in deleted {
            if old.labels.is_empty() {
                debug!(namespace = %old.namespace, name = %old.name, "no labels, cannot trace replacement");
                continue;
            }

            let selector = LabelSelector::from_labels(&old.labels);
            match self.cache.list_namespaced(&old.namespace, &selector) {
                Ok(pods) => {
                    for pod in pods {
                        candidates.insert(pod.uid.clone(), pod);
                    }
                }
                Err(e) => {
                    error!(
                        namespace = %old.namespace,
                        labels = %selector,
                        error = %e,
                        "failed to list pods for verification"
                    );
                }
            }
        }

        let now = epoch_secs();
        let mut notified = 0;
        let mut notify_failures = 0;

        for pod in candidates.values() {
            if !is_unhealthy_replacement(&self.policy, pod, now) {
                continue;
            }

            let msg = NotificationMessage::from_instance(pod);
            match self.notifier.send(&msg).await {
                Ok(()) => notified += 1,
                Err(e) => {
                    notify_failures += 1;
                    error!(
                        namespace = %pod.namespace,
                        name = %pod.name,
                        phase = %pod.phase,
                        error = %e,
                        "failed to send notification"
                    );
                }
            }
        }

        debug!(
            replacements = candidates.len(),
            notified, notify_failures, "verification finished"
        );

        Verification::Completed {
            replacements: candidates.len(),
            notified,
            notify_failures,
        }
    }
}

/// Whether `pod` started less than [`NEW_INSTANCE_AGE`] before `now`
/// (epoch seconds) and is not healthy. Pods without a start time never
/// qualify; a start time in the future counts as age zero.
pub fn is_unhealthy_replacement(policy: &Policy, pod: &WorkloadInstance, now: u64) -> bool {
    let Some(started) = pod.start_time else {
        return false;
    };
    let age = Duration::from_secs(now.saturating_sub(started));
    age < NEW_INSTANCE_AGE && !policy.is_healthy(&pod.phase)
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
