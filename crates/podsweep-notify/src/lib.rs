//! podsweep-notify: alerting for replacements that came back unhealthy.
//!
//! The cleaner hands each anomaly to a [`NotificationSink`] exactly once
//! and treats any error as log-and-continue. Sinks bound their own
//! latency so a slow endpoint cannot stall a cycle.
//!
//! - [`LogSink`]: one structured `tracing` event per alert (the default).
//! - [`WebhookSink`]: JSON POST to a plain-HTTP endpoint with a timeout.

pub mod error;
pub mod sink;
pub mod webhook;

pub use error::{NotifyError, NotifyResult};
pub use sink::{LogSink, NotificationSink};
pub use webhook::WebhookSink;
