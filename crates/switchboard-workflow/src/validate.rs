//! Structural validation of graph definitions.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};
use switchboard_config::{NodeDef, NodeKind, NodeType, WorkflowDef};

use crate::error::{GraphError, GraphWarning};
use crate::ports::{input_ports, output_ports};

/// Outcome of validating a graph definition.
///
/// `errors` make the graph unrunnable; `warnings` are informational.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
  pub errors: Vec<GraphError>,
  pub warnings: Vec<GraphWarning>,
}

impl ValidationResult {
  pub fn is_valid(&self) -> bool {
    self.errors.is_empty()
  }
}

impl fmt::Display for ValidationResult {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let messages: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
    f.write_str(&messages.join("; "))
  }
}

#[derive(Serialize)]
struct Issue<'a> {
  code: &'static str,
  message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  node_id: Option<&'a str>,
  #[serde(skip_serializing_if = "Option::is_none")]
  edge_index: Option<usize>,
}

impl Serialize for ValidationResult {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let errors: Vec<Issue<'_>> = self
      .errors
      .iter()
      .map(|e| Issue {
        code: e.code(),
        message: e.to_string(),
        node_id: e.node_id(),
        edge_index: e.edge_index(),
      })
      .collect();
    let warnings: Vec<Issue<'_>> = self
      .warnings
      .iter()
      .map(|w| Issue {
        code: w.code(),
        message: w.to_string(),
        node_id: w.node_id(),
        edge_index: None,
      })
      .collect();

    let mut state = serializer.serialize_struct("ValidationResult", 3)?;
    state.serialize_field("is_valid", &self.is_valid())?;
    state.serialize_field("errors", &errors)?;
    state.serialize_field("warnings", &warnings)?;
    state.end()
  }
}

/// Validate a graph definition. Never fails; every violation is reported.
pub fn validate(def: &WorkflowDef) -> ValidationResult {
  let mut result = ValidationResult::default();

  if def.nodes.is_empty() {
    result.errors.push(GraphError::EmptyWorkflow);
  }

  let mut nodes: HashMap<&str, &NodeDef> = HashMap::new();
  for node in &def.nodes {
    if nodes.insert(node.node_id.as_str(), node).is_some() {
      result.errors.push(GraphError::DuplicateNode {
        node_id: node.node_id.clone(),
      });
    }
  }

  if def.nodes_of_kind(NodeKind::Trigger).next().is_none() {
    result.errors.push(GraphError::NoTrigger);
  }

  check_edges(def, &nodes, &mut result);
  collect_warnings(def, &mut result);

  result
}

fn check_edges(def: &WorkflowDef, nodes: &HashMap<&str, &NodeDef>, result: &mut ValidationResult) {
  for (index, edge) in def.edges.iter().enumerate() {
    let source = nodes.get(edge.source.as_str());
    let target = nodes.get(edge.target.as_str());

    if source.is_none() {
      result.errors.push(GraphError::DanglingEdge {
        index,
        node_id: edge.source.clone(),
      });
    }
    if target.is_none() {
      result.errors.push(GraphError::DanglingEdge {
        index,
        node_id: edge.target.clone(),
      });
    }
    let (Some(source), Some(target)) = (source, target) else {
      continue;
    };

    if edge.source == edge.target {
      result.errors.push(GraphError::SelfEdge {
        index,
        node_id: edge.source.clone(),
      });
      continue;
    }

    if !output_ports(source).contains(&edge.source_port.as_str()) {
      result.errors.push(GraphError::UnknownPort {
        index,
        node_id: edge.source.clone(),
        port: edge.source_port.clone(),
      });
    }

    if matches!(target.node_type, NodeType::Trigger(_)) {
      result.errors.push(GraphError::TriggerInput {
        index,
        node_id: edge.target.clone(),
      });
    } else if !input_ports(target).contains(&edge.target_port.as_str()) {
      result.errors.push(GraphError::UnknownPort {
        index,
        node_id: edge.target.clone(),
        port: edge.target_port.clone(),
      });
    }

    if let Some(first) = def.edges[..index].iter().position(|e| e.same_endpoints(edge)) {
      result.errors.push(GraphError::DuplicateEdge { index, first });
    }
  }
}

fn collect_warnings(def: &WorkflowDef, result: &mut ValidationResult) {
  let sources: HashSet<&str> = def.edges.iter().map(|e| e.source.as_str()).collect();
  let targets: HashSet<&str> = def.edges.iter().map(|e| e.target.as_str()).collect();
  let tool_names: HashSet<&str> = def
    .nodes
    .iter()
    .filter_map(|n| match &n.node_type {
      NodeType::Tool(tool) => Some(tool.name.as_str()),
      _ => None,
    })
    .collect();

  // A lone trigger is a valid (if trivial) graph; don't warn about it.
  let lone_node = def.nodes.len() == 1;

  for node in &def.nodes {
    let id = node.node_id.as_str();
    let connected = sources.contains(id) || targets.contains(id);

    if !connected && !lone_node {
      result.warnings.push(GraphWarning::Disconnected {
        node_id: node.node_id.clone(),
      });
    } else if connected && !targets.contains(id) && node.kind() != NodeKind::Trigger {
      result.warnings.push(GraphWarning::Unreachable {
        node_id: node.node_id.clone(),
      });
    }

    if let NodeType::Agent(agent) = &node.node_type {
      if agent.instructions.trim().is_empty() {
        result.warnings.push(GraphWarning::MissingInstructions {
          node_id: node.node_id.clone(),
        });
      }
      for tool in &agent.tools {
        if !tool_names.contains(tool.as_str()) {
          result.warnings.push(GraphWarning::UnknownToolReference {
            node_id: node.node_id.clone(),
            tool: tool.clone(),
          });
        }
      }
    }
  }

  if !def.nodes.is_empty() && def.nodes_of_kind(NodeKind::Agent).next().is_none() {
    result.warnings.push(GraphWarning::NoAgents);
  }
}
