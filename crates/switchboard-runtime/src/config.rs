use serde::{Deserialize, Serialize};
use switchboard_config::{FailurePolicy, WorkflowSettings};

pub const DEFAULT_STEP_BUDGET: usize = 256;
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Process-wide defaults, overridden per workflow by [`WorkflowSettings`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
  /// Maximum node activations per run.
  pub step_budget: usize,
  /// Timeout for a single node invocation. `None` waits indefinitely.
  pub node_timeout_ms: Option<u64>,
  /// Extra attempts after a retryable failure.
  pub max_retries: u32,
  /// Pause between attempts.
  pub retry_delay_ms: u64,
  pub failure_policy: FailurePolicy,
}

impl Default for RuntimeConfig {
  fn default() -> Self {
    Self {
      step_budget: DEFAULT_STEP_BUDGET,
      node_timeout_ms: None,
      max_retries: DEFAULT_MAX_RETRIES,
      retry_delay_ms: 0,
      failure_policy: FailurePolicy::default(),
    }
  }
}

impl RuntimeConfig {
  /// Combine with a workflow's settings. Workflow values win.
  pub fn limits_for(&self, settings: &WorkflowSettings) -> RunLimits {
    RunLimits {
      step_budget: settings.step_budget.unwrap_or(self.step_budget),
      node_timeout_ms: settings.timeout_ms.or(self.node_timeout_ms),
      max_retries: settings.max_retries.unwrap_or(self.max_retries),
      retry_delay_ms: self.retry_delay_ms,
      failure_policy: settings.failure_policy.unwrap_or(self.failure_policy),
    }
  }
}

/// Effective limits for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunLimits {
  pub step_budget: usize,
  pub node_timeout_ms: Option<u64>,
  pub max_retries: u32,
  pub retry_delay_ms: u64,
  pub failure_policy: FailurePolicy,
}
