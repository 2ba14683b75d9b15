//! Trace events recorded around node activations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use switchboard_config::NodeKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TracePhase {
  Start,
  End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStatus {
  Running,
  Success,
  Error,
}

/// One start or end event of a node activation.
///
/// Start and end share `node_id` and `activation` (the start's sequence
/// number). Sequence numbers are unique and increasing within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
  pub id: String,
  pub sequence: u64,
  /// Sequence number of the start trace of this activation.
  pub activation: u64,
  pub node_id: String,
  pub node_kind: NodeKind,
  pub phase: TracePhase,
  pub status: TraceStatus,
  pub input: serde_json::Value,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub output: Option<serde_json::Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  pub started_at: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ended_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub duration_ms: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub metadata: Option<serde_json::Value>,
}

impl Trace {
  pub fn is_start(&self) -> bool {
    self.phase == TracePhase::Start
  }

  pub fn is_end(&self) -> bool {
    self.phase == TracePhase::End
  }
}
