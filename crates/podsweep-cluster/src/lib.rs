//! podsweep-cluster: the cluster as seen by the remediation loop.
//!
//! The cleaner never talks to the API server directly. It reads pods
//! through a [`PodCache`] (an eventually-consistent local mirror) and asks
//! a [`PodMutator`] to delete them.
//!
//! # Implementations
//!
//! ```text
//! PodCache / PodMutator
//!   ├── KubePodCache    (kube reflector store, fed by a pod watcher task)
//!   ├── KubePodMutator  (Api<Pod>::delete)
//!   └── MemoryCluster   (both traits, in-process; used by tests)
//! ```

pub mod cache;
pub mod convert;
pub mod error;
pub mod k8s;
pub mod memory;

pub use cache::{PodCache, PodMutator};
pub use error::{ClusterError, ClusterResult};
pub use k8s::{build_client, KubePodCache, KubePodMutator};
pub use memory::MemoryCluster;
