//! The sink trait and the default log-only implementation.

use async_trait::async_trait;
use tracing::warn;

use podsweep_core::NotificationMessage;

use crate::error::NotifyResult;

/// Destination for anomaly alerts.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, msg: &NotificationMessage) -> NotifyResult<()>;
}

/// Emits each alert as a structured log event. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSink for LogSink {
    async fn send(&self, msg: &NotificationMessage) -> NotifyResult<()> {
        warn!(
            namespace = %msg.namespace,
            pod = %msg.pod_name,
            phase = %msg.phase,
            reason = %msg.reason,
            status_message = %msg.message,
            "replacement pod unhealthy after cleanup"
        );
        Ok(())
    }
}
