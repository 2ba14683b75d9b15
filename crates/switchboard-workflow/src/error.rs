use thiserror::Error;

use crate::validate::ValidationResult;

/// A structural violation. Any of these prevents a graph from running.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
  #[error("workflow has no nodes")]
  EmptyWorkflow,

  #[error("workflow has no trigger nodes")]
  NoTrigger,

  #[error("duplicate node id '{node_id}'")]
  DuplicateNode { node_id: String },

  #[error("edge {index} references unknown node '{node_id}'")]
  DanglingEdge { index: usize, node_id: String },

  #[error("edge {index} connects node '{node_id}' to itself")]
  SelfEdge { index: usize, node_id: String },

  #[error("edge {index} duplicates edge {first}")]
  DuplicateEdge { index: usize, first: usize },

  #[error("edge {index} uses unknown port '{port}' on node '{node_id}'")]
  UnknownPort {
    index: usize,
    node_id: String,
    port: String,
  },

  #[error("edge {index} targets trigger '{node_id}', which has no input port")]
  TriggerInput { index: usize, node_id: String },
}

impl GraphError {
  pub fn code(&self) -> &'static str {
    match self {
      GraphError::EmptyWorkflow => "empty_workflow",
      GraphError::NoTrigger => "no_trigger",
      GraphError::DuplicateNode { .. } => "duplicate_node",
      GraphError::DanglingEdge { .. } => "dangling_edge",
      GraphError::SelfEdge { .. } => "self_edge",
      GraphError::DuplicateEdge { .. } => "duplicate_edge",
      GraphError::UnknownPort { .. } => "unknown_port",
      GraphError::TriggerInput { .. } => "trigger_input",
    }
  }

  pub fn node_id(&self) -> Option<&str> {
    match self {
      GraphError::DuplicateNode { node_id }
      | GraphError::DanglingEdge { node_id, .. }
      | GraphError::SelfEdge { node_id, .. }
      | GraphError::UnknownPort { node_id, .. }
      | GraphError::TriggerInput { node_id, .. } => Some(node_id),
      _ => None,
    }
  }

  pub fn edge_index(&self) -> Option<usize> {
    match self {
      GraphError::DanglingEdge { index, .. }
      | GraphError::SelfEdge { index, .. }
      | GraphError::DuplicateEdge { index, .. }
      | GraphError::UnknownPort { index, .. }
      | GraphError::TriggerInput { index, .. } => Some(*index),
      _ => None,
    }
  }
}

/// Something suspicious that does not stop the graph from running.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphWarning {
  #[error("node '{node_id}' is not connected to the workflow")]
  Disconnected { node_id: String },

  #[error("node '{node_id}' has no incoming edges and will never run")]
  Unreachable { node_id: String },

  #[error("agent '{node_id}' has no instructions")]
  MissingInstructions { node_id: String },

  #[error("agent '{node_id}' references unknown tool '{tool}'")]
  UnknownToolReference { node_id: String, tool: String },

  #[error("workflow has no agent nodes")]
  NoAgents,
}

impl GraphWarning {
  pub fn code(&self) -> &'static str {
    match self {
      GraphWarning::Disconnected { .. } => "disconnected",
      GraphWarning::Unreachable { .. } => "unreachable",
      GraphWarning::MissingInstructions { .. } => "missing_instructions",
      GraphWarning::UnknownToolReference { .. } => "unknown_tool_reference",
      GraphWarning::NoAgents => "no_agents",
    }
  }

  pub fn node_id(&self) -> Option<&str> {
    match self {
      GraphWarning::Disconnected { node_id }
      | GraphWarning::Unreachable { node_id }
      | GraphWarning::MissingInstructions { node_id }
      | GraphWarning::UnknownToolReference { node_id, .. } => Some(node_id),
      GraphWarning::NoAgents => None,
    }
  }
}

/// Errors building a [`Graph`](crate::Graph).
#[derive(Debug, Error)]
pub enum WorkflowError {
  #[error("invalid workflow graph: {0}")]
  Invalid(ValidationResult),
}

impl WorkflowError {
  pub fn validation(&self) -> &ValidationResult {
    match self {
      WorkflowError::Invalid(result) => result,
    }
  }
}
