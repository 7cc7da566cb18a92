//! Error types for cluster reads and mutations.

use thiserror::Error;

/// Result type alias for cluster operations.
pub type ClusterResult<T> = Result<T, ClusterError>;

/// Errors returned by [`PodCache`](crate::PodCache) and
/// [`PodMutator`](crate::PodMutator) implementations.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("pod not found: {namespace}/{name}")]
    NotFound { namespace: String, name: String },

    #[error("pod cache error: {0}")]
    Cache(String),

    #[error("kubernetes API error: {0}")]
    Api(String),

    #[error("client configuration error: {0}")]
    Config(String),
}

impl ClusterError {
    pub fn not_found(namespace: &str, name: &str) -> Self {
        Self::NotFound {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
