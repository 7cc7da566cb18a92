//! podsweepd: the pod cleaner daemon.
//!
//! Watches every pod in the cluster, deletes the ones whose phase is not
//! healthy outside the excluded namespaces, and alerts when a replacement
//! comes back unhealthy.
//!
//! # Usage
//!
//! ```text
//! podsweepd --policy-config /etc/podsweep/policy.yaml --cleaning-interval 10m
//! ```

mod cli;
mod daemon;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, LogFormat};

const DEFAULT_LOG_FILTER: &str = "info,podsweepd=debug,podsweep_cleaner=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);
    daemon::run(cli).await
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}
