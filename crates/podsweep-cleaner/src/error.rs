//! Cleaner error types.
//!
//! Only setup failures surface as errors. Everything that goes wrong
//! inside a cycle is logged where it happens and the cycle moves on.

use thiserror::Error;

pub type CleanerResult<T> = Result<T, CleanerError>;

#[derive(Debug, Error)]
pub enum CleanerError {
    #[error("failed to wait for pod cache to sync: {0}")]
    CacheSync(String),
}
