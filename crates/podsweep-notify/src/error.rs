//! Notification error types.

use std::time::Duration;

use thiserror::Error;

pub type NotifyResult<T> = Result<T, NotifyError>;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid webhook url: {0}")]
    InvalidUrl(String),

    #[error("failed to encode notification: {0}")]
    Encode(String),

    #[error("webhook transport error: {0}")]
    Transport(String),

    #[error("webhook returned HTTP {0}")]
    Status(u16),

    #[error("webhook timed out after {0:?}")]
    Timeout(Duration),
}
