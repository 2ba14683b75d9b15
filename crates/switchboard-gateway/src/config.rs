use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_RETAINED_RUNS: usize = 1000;

/// HTTP server settings, the `[gateway]` table of the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
  pub host: String,
  pub port: u16,
  /// Interval between keep-alive comments on event streams.
  pub keep_alive_secs: u64,
  /// Runs kept in memory before the oldest finished ones are evicted.
  pub max_retained_runs: usize,
}

impl Default for GatewayConfig {
  fn default() -> Self {
    Self {
      host: "127.0.0.1".to_string(),
      port: 8080,
      keep_alive_secs: 15,
      max_retained_runs: DEFAULT_MAX_RETAINED_RUNS,
    }
  }
}

impl GatewayConfig {
  pub fn address(&self) -> String {
    format!("{}:{}", self.host, self.port)
  }

  pub fn keep_alive(&self) -> Duration {
    Duration::from_secs(self.keep_alive_secs.max(1))
  }
}
