//! Wires the cluster adapters, sink and driver together and runs them
//! until done or signalled.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{info, warn};

use podsweep_cleaner::{Driver, PodCleaner, RunMode};
use podsweep_cluster::{build_client, KubePodCache, KubePodMutator};
use podsweep_core::PolicyConfig;
use podsweep_notify::WebhookSink;

use crate::cli::Cli;

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = PolicyConfig::load(cli.policy_config.as_deref()).context("load policy config")?;
    info!(
        excluded_namespaces = ?config.excluded_namespaces,
        healthy_statuses = ?config.healthy_statuses,
        check_delay_seconds = config.check_delay_seconds,
        "policy loaded"
    );

    let client = build_client(cli.kubeconfig.as_deref(), cli.master.as_deref())
        .await
        .context("build kubernetes client")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let (cache, watch_handle) = KubePodCache::start(client.clone(), shutdown_rx.clone());
    let mutator = KubePodMutator::new(client);

    let mut cleaner = PodCleaner::new(Arc::new(cache), Arc::new(mutator), &config);
    if let Some(url) = cli.notify_webhook.as_deref() {
        let sink = WebhookSink::new(url).context("configure notification webhook")?;
        info!(url, "notifications go to webhook");
        cleaner = cleaner.with_notifier(Arc::new(sink));
    }

    let mode = RunMode::from_interval(cli.cleaning_interval);
    let driver = Driver::new(cleaner, mode).with_sync_timeout(cli.cache_sync_timeout);
    info!(mode = ?mode, "podsweep daemon starting");

    let run = driver.run(shutdown_rx);
    tokio::pin!(run);

    let result = tokio::select! {
        res = &mut run => res,
        _ = shutdown_signal() => {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
            run.await
        }
    };

    let _ = shutdown_tx.send(true);
    let _ = watch_handle.await;

    let cycles = result.context("pod cleaner")?;
    info!(cycles, "podsweep daemon stopped");
    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
