use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Result of a single node invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExecutionOutcome {
  Success {
    output: serde_json::Value,
    /// Extra detail recorded on the trace (e.g. which agents a handoff connects).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<serde_json::Value>,
  },
  Failure {
    reason: String,
    retryable: bool,
  },
}

impl ExecutionOutcome {
  pub fn success(output: serde_json::Value) -> Self {
    ExecutionOutcome::Success {
      output,
      metadata: None,
    }
  }

  /// A failure that halts the branch without retrying.
  pub fn failure(reason: impl Into<String>) -> Self {
    ExecutionOutcome::Failure {
      reason: reason.into(),
      retryable: false,
    }
  }

  /// A failure the runtime may retry.
  pub fn retryable(reason: impl Into<String>) -> Self {
    ExecutionOutcome::Failure {
      reason: reason.into(),
      retryable: true,
    }
  }

  /// Attach metadata to a success. Failures are returned unchanged.
  pub fn with_metadata(self, metadata: serde_json::Value) -> Self {
    match self {
      ExecutionOutcome::Success { output, .. } => ExecutionOutcome::Success {
        output,
        metadata: Some(metadata),
      },
      failure => failure,
    }
  }

  pub fn is_success(&self) -> bool {
    matches!(self, ExecutionOutcome::Success { .. })
  }

  pub fn is_retryable(&self) -> bool {
    matches!(self, ExecutionOutcome::Failure { retryable: true, .. })
  }
}

/// What a node activation receives.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationInput {
  /// Output forwarded along the inbound edge. For triggers, the run input.
  pub payload: serde_json::Value,
  /// The original run input, unless a handoff upstream dropped it.
  pub context: Option<Arc<serde_json::Value>>,
  /// 1-based invocation attempt within this activation.
  pub attempt: u32,
}

impl ActivationInput {
  pub fn new(payload: serde_json::Value, context: Option<Arc<serde_json::Value>>) -> Self {
    Self {
      payload,
      context,
      attempt: 1,
    }
  }

  pub fn context_value(&self) -> serde_json::Value {
    self
      .context
      .as_deref()
      .cloned()
      .unwrap_or(serde_json::Value::Null)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_outcome_serializes_with_tag() {
    let value = serde_json::to_value(ExecutionOutcome::retryable("rate limited")).unwrap();
    assert_eq!(
      value,
      json!({"outcome": "failure", "reason": "rate limited", "retryable": true})
    );

    let value = serde_json::to_value(ExecutionOutcome::success(json!("ok"))).unwrap();
    assert_eq!(value, json!({"outcome": "success", "output": "ok"}));
  }

  #[test]
  fn test_metadata_only_attaches_to_success() {
    let ok = ExecutionOutcome::success(json!(1)).with_metadata(json!({"k": "v"}));
    assert_eq!(
      ok,
      ExecutionOutcome::Success {
        output: json!(1),
        metadata: Some(json!({"k": "v"}))
      }
    );

    let failed = ExecutionOutcome::failure("nope").with_metadata(json!({"k": "v"}));
    assert_eq!(failed, ExecutionOutcome::failure("nope"));
    assert!(!failed.is_retryable());
  }
}
