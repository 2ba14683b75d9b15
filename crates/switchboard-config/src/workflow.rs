use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::edge::Edge;
use crate::enums::{FailurePolicy, NodeKind};
use crate::node::NodeDef;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDef {
  pub workflow_id: String,
  pub name: String,
  #[serde(default)]
  pub description: String,
  pub nodes: Vec<NodeDef>,
  #[serde(default)]
  pub edges: Vec<Edge>,
  #[serde(default)]
  pub settings: WorkflowSettings,
}

/// Per-workflow run settings. Unset values fall back to the runtime defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkflowSettings {
  /// Extra attempts granted to a node that reports a retryable failure.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub max_retries: Option<u32>,
  /// Timeout for a single node invocation.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timeout_ms: Option<u64>,
  /// Maximum node activations per run.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub step_budget: Option<usize>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub failure_policy: Option<FailurePolicy>,
}

impl WorkflowDef {
  pub fn new(workflow_id: impl Into<String>, name: impl Into<String>) -> Self {
    Self {
      workflow_id: workflow_id.into(),
      name: name.into(),
      description: String::new(),
      nodes: Vec::new(),
      edges: Vec::new(),
      settings: WorkflowSettings::default(),
    }
  }

  pub fn node(mut self, node: NodeDef) -> Self {
    self.nodes.push(node);
    self
  }

  pub fn edge(mut self, edge: Edge) -> Self {
    self.edges.push(edge);
    self
  }

  pub fn settings(mut self, settings: WorkflowSettings) -> Self {
    self.settings = settings;
    self
  }

  /// Get a node by ID.
  pub fn get_node(&self, node_id: &str) -> Option<&NodeDef> {
    self.nodes.iter().find(|n| n.node_id == node_id)
  }

  pub fn summary(&self) -> WorkflowSummary {
    let mut nodes_by_kind = BTreeMap::new();
    for node in &self.nodes {
      *nodes_by_kind.entry(node.kind().as_str()).or_insert(0) += 1;
    }

    WorkflowSummary {
      name: self.name.clone(),
      node_count: self.nodes.len(),
      nodes_by_kind,
      edge_count: self.edges.len(),
    }
  }

  /// Nodes of the given kind, in declaration order.
  pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &NodeDef> {
    self.nodes.iter().filter(move |n| n.kind() == kind)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowSummary {
  pub name: String,
  pub node_count: usize,
  pub nodes_by_kind: BTreeMap<&'static str, usize>,
  pub edge_count: usize,
}

impl fmt::Display for WorkflowSummary {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "Workflow: {}", self.name)?;
    writeln!(f, "Nodes: {} total", self.node_count)?;
    for (kind, count) in &self.nodes_by_kind {
      writeln!(f, "  - {} {}(s)", count, kind)?;
    }
    write!(f, "Connections: {}", self.edge_count)
  }
}
