//! Shutdown signal helpers.

use tokio::sync::watch;

/// Resolves once shutdown is requested or the sender is dropped.
///
/// Returns immediately if shutdown was already requested.
pub async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    // The returned guard is not Send; drop it before yielding.
    let _ = shutdown.wait_for(|&stop| stop).await;
}

pub fn is_shutdown(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow()
}
