use std::fmt;

use serde::{Deserialize, Serialize};

/// The four node kinds an agent graph is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
  Trigger,
  Agent,
  Tool,
  Handoff,
}

impl NodeKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      NodeKind::Trigger => "trigger",
      NodeKind::Agent => "agent",
      NodeKind::Tool => "tool",
      NodeKind::Handoff => "handoff",
    }
  }
}

impl fmt::Display for NodeKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
  Api,
  Webhook,
  Schedule,
  #[default]
  Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
  String,
  Number,
  Boolean,
  Object,
  Array,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
  #[default]
  Data,
  Action,
  Agent,
}

/// Risk classification of a tool. Carried for policy hooks; the engine does not
/// enforce it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
  #[default]
  Low,
  Medium,
  High,
}

/// How a run is reported when no branch ended in success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
  /// Branch failures stay in the trace log; the run still completes.
  #[default]
  CompleteWithErrors,
  /// The run fails when every branch ended in a node failure.
  FailWhenAllBranchesFail,
}
