//! podsweep-core: shared types for the podsweep remediation loop.
//!
//! Holds the pod snapshot model ([`WorkloadInstance`]), equality label
//! selectors, the per-run [`PolicyConfig`] and the pure [`Policy`]
//! evaluator that decides which pods are deletion candidates.

pub mod config;
pub mod error;
pub mod policy;
pub mod types;

pub use config::PolicyConfig;
pub use error::{ConfigError, ConfigResult};
pub use policy::Policy;
pub use types::*;
