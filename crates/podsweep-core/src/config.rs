//! Policy configuration parser.
//!
//! The policy file is a small key-value document, YAML by default or TOML
//! when the path ends in `.toml`:
//!
//! ```yaml
//! excludedNamespaces: ["kube-system"]
//! healthyStatuses: ["Running", "Init"]
//! checkDelaySeconds: 180
//! ```
//!
//! Unknown keys are rejected. A file written against another schema
//! (e.g. `excludePodStatus`) would otherwise load with an empty healthy
//! set and every pod in the cluster would become a deletion candidate.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Delay before verifying replacements when the file does not set one.
pub const DEFAULT_CHECK_DELAY_SECS: u64 = 180;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PolicyConfig {
    /// Namespaces whose pods are never deleted. Matched exactly.
    #[serde(default)]
    pub excluded_namespaces: Vec<String>,
    /// Phases that count as healthy. Matched case-insensitively.
    #[serde(default)]
    pub healthy_statuses: Vec<String>,
    #[serde(default = "default_check_delay_secs")]
    pub check_delay_seconds: u64,
}

fn default_check_delay_secs() -> u64 {
    DEFAULT_CHECK_DELAY_SECS
}

impl Default for PolicyConfig {
    /// Policy used when no config file is given.
    fn default() -> Self {
        Self {
            excluded_namespaces: vec!["kube-system".to_string()],
            healthy_statuses: vec!["Running".to_string(), "Init".to_string()],
            check_delay_seconds: DEFAULT_CHECK_DELAY_SECS,
        }
    }
}

impl PolicyConfig {
    /// Load the policy from `path`, or the built-in default when `None`.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            Self::from_toml_str(&content).map_err(|source| ConfigError::Toml {
                path: path.to_path_buf(),
                source,
            })
        } else {
            Self::from_yaml_str(&content).map_err(|source| ConfigError::Yaml {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(s)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn check_delay(&self) -> Duration {
        Duration::from_secs(self.check_delay_seconds)
    }
}
