//! Command-line flags.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "podsweepd",
    version,
    about = "Deletes unhealthy pods and alerts when their replacements come back unhealthy"
)]
pub struct Cli {
    /// Path to a kubeconfig. Inferred when absent.
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// API server URL, overriding the kubeconfig.
    #[arg(long)]
    pub master: Option<String>,

    /// Policy file (YAML, or TOML with a .toml extension).
    #[arg(long)]
    pub policy_config: Option<PathBuf>,

    /// Time between cleaning cycles. 0 runs a single cycle and exits.
    #[arg(long, default_value = "0", value_parser = parse_duration)]
    pub cleaning_interval: Duration,

    /// Give up if the pod cache has not synced within this time. 0 waits forever.
    #[arg(long, default_value = "0", value_parser = parse_duration)]
    pub cache_sync_timeout: Duration,

    /// POST alerts to this http:// URL instead of logging them.
    #[arg(long)]
    pub notify_webhook: Option<String>,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Parse a duration like "500ms", "30s", "10m", "1h", or plain seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let parsed = if let Some(ms) = s.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else if let Some(hours) = s.strip_suffix('h') {
        hours
            .parse::<u64>()
            .ok()
            .and_then(|h| h.checked_mul(3600))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    };
    parsed.ok_or_else(|| format!("invalid duration {s:?} (expected e.g. 500ms, 30s, 10m, 1h)"))
}
