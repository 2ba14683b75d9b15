//! Config file loading.
//!
//! ```toml
//! [runtime]
//! step_budget = 256
//! max_retries = 3
//! node_timeout_ms = 30000
//! failure_policy = "complete_with_errors"
//!
//! [gateway]
//! host = "127.0.0.1"
//! port = 8080
//! max_retained_runs = 1000
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use switchboard_gateway::GatewayConfig;
use switchboard_runtime::RuntimeConfig;

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  pub runtime: RuntimeConfig,
  pub gateway: GatewayConfig,
}

/// Default data directory, `~/.switchboard`.
pub fn default_data_dir() -> Result<PathBuf> {
  dirs::home_dir()
    .map(|home| home.join(".switchboard"))
    .context("could not determine home directory")
}

impl AppConfig {
  /// Load `explicit` if given, else `<data_dir>/config.toml` if it exists,
  /// else defaults. An explicit path that cannot be read is an error.
  pub fn load(explicit: Option<&Path>, data_dir: &Path) -> Result<Self> {
    let path = match explicit {
      Some(path) => path.to_path_buf(),
      None => {
        let path = data_dir.join(CONFIG_FILE);
        if !path.exists() {
          return Ok(Self::default());
        }
        path
      }
    };

    let content = std::fs::read_to_string(&path)
      .with_context(|| format!("failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
      .with_context(|| format!("failed to parse config file: {}", path.display()))
  }
}
