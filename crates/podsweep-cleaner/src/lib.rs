//! podsweep-cleaner: the remediation loop.
//!
//! One cycle lists every pod from the cache, deletes the ones the policy
//! flags, waits `checkDelaySeconds`, then looks up the replacements of
//! the deleted pods by label and alerts on any that are young and still
//! unhealthy.
//!
//! # Architecture
//!
//! ```text
//! Driver
//!   ├── wait for PodCache sync (cancellable, optional timeout)
//!   └── OneShot | Interval(period)
//!       └── PodCleaner::run_cycle()
//!           ├── PodCache::list(everything)
//!           ├── Policy::is_deletion_candidate()
//!           ├── PodCache::get() → PodMutator::delete()
//!           ├── cancellable check delay
//!           ├── PodCache::list_namespaced(labels), dedup by uid
//!           └── NotificationSink::send()
//! ```
//!
//! Every suspension point watches the same shutdown signal: a
//! `watch::Receiver<bool>` that flips to `true` (or whose sender is
//! dropped) when the run should stop.

pub mod cycle;
pub mod driver;
pub mod error;
pub mod signal;

pub use cycle::{CycleReport, PodCleaner, Verification, NEW_INSTANCE_AGE};
pub use driver::{Driver, RunMode};
pub use error::{CleanerError, CleanerResult};
