use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::trace::Trace;

/// Lifecycle: `Pending -> Running -> {Completed | Failed | Cancelled}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
  Pending,
  Running,
  Completed,
  Failed,
  Cancelled,
}

impl RunStatus {
  pub fn is_terminal(self) -> bool {
    matches!(
      self,
      RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled
    )
  }

  pub fn as_str(self) -> &'static str {
    match self {
      RunStatus::Pending => "pending",
      RunStatus::Running => "running",
      RunStatus::Completed => "completed",
      RunStatus::Failed => "failed",
      RunStatus::Cancelled => "cancelled",
    }
  }
}

impl fmt::Display for RunStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One execution of a workflow against an input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRun {
  pub id: String,
  pub workflow_id: String,
  pub status: RunStatus,
  pub started_at: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ended_at: Option<DateTime<Utc>>,
  pub input: serde_json::Value,
  /// Leaf node ID -> output of its last successful activation.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub output: Option<serde_json::Value>,
  /// Run-level failure reason. Branch failures stay in the traces.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  #[serde(default)]
  pub traces: Vec<Trace>,
}

impl ExecutionRun {
  pub fn new(workflow_id: impl Into<String>, input: serde_json::Value) -> Self {
    Self {
      id: uuid::Uuid::new_v4().to_string(),
      workflow_id: workflow_id.into(),
      status: RunStatus::Pending,
      started_at: Utc::now(),
      ended_at: None,
      input,
      output: None,
      error: None,
      traces: Vec::new(),
    }
  }

  /// A run that failed before any node was activated.
  pub fn rejected(
    workflow_id: impl Into<String>,
    input: serde_json::Value,
    error: impl Into<String>,
  ) -> Self {
    let mut run = Self::new(workflow_id, input);
    run.status = RunStatus::Failed;
    run.ended_at = Some(run.started_at);
    run.error = Some(error.into());
    run
  }

  pub fn is_terminal(&self) -> bool {
    self.status.is_terminal()
  }

  pub fn duration_ms(&self) -> Option<u64> {
    self.ended_at.map(|ended| elapsed_ms(self.started_at, ended))
  }

  /// End traces, in sequence order.
  pub fn end_traces(&self) -> impl Iterator<Item = &Trace> {
    self.traces.iter().filter(|t| t.is_end())
  }
}

pub(crate) fn elapsed_ms(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
  u64::try_from((to - from).num_milliseconds()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_rejected_run_is_terminal() {
    let run = ExecutionRun::rejected("wf", json!({}), "invalid graph: no trigger");
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.is_terminal());
    assert!(run.traces.is_empty());
    assert_eq!(run.duration_ms(), Some(0));
  }

  #[test]
  fn test_status_serialization() {
    assert_eq!(
      serde_json::to_value(RunStatus::Cancelled).unwrap(),
      json!("cancelled")
    );
    assert!(!RunStatus::Running.is_terminal());
    assert_eq!(RunStatus::Completed.to_string(), "completed");
  }
}
