use std::collections::HashMap;

use switchboard_config::{Edge, NodeDef, NodeType, WorkflowDef, WorkflowSettings};

use crate::error::WorkflowError;
use crate::validate::validate;

/// Validated, immutable graph used for traversal.
///
/// Node and edge order follow the definition, so entry points and fan-out are
/// deterministic.
#[derive(Debug, Clone)]
pub struct Graph {
  def: WorkflowDef,
  /// node_id -> position in `def.nodes`.
  index: HashMap<String, usize>,
  /// node_id -> positions in `def.edges` of edges leaving the node.
  outgoing: HashMap<String, Vec<usize>>,
  /// node_id -> positions in `def.edges` of edges entering the node.
  incoming: HashMap<String, Vec<usize>>,
  /// Positions in `def.nodes` of triggers with no incoming edge.
  entry_points: Vec<usize>,
}

impl Graph {
  /// Validate a definition and build the graph.
  ///
  /// Fails with every structural violation if the definition is invalid.
  /// Warnings do not prevent construction.
  pub fn new(def: WorkflowDef) -> Result<Self, WorkflowError> {
    let validation = validate(&def);
    if !validation.is_valid() {
      return Err(WorkflowError::Invalid(validation));
    }

    let index: HashMap<String, usize> = def
      .nodes
      .iter()
      .enumerate()
      .map(|(i, n)| (n.node_id.clone(), i))
      .collect();

    let mut outgoing: HashMap<String, Vec<usize>> = HashMap::new();
    let mut incoming: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, edge) in def.edges.iter().enumerate() {
      outgoing.entry(edge.source.clone()).or_default().push(i);
      incoming.entry(edge.target.clone()).or_default().push(i);
    }

    let entry_points = def
      .nodes
      .iter()
      .enumerate()
      .filter(|(_, n)| matches!(n.node_type, NodeType::Trigger(_)))
      .filter(|(_, n)| incoming.get(&n.node_id).is_none_or(|v| v.is_empty()))
      .map(|(i, _)| i)
      .collect();

    Ok(Self {
      def,
      index,
      outgoing,
      incoming,
      entry_points,
    })
  }

  pub fn workflow_id(&self) -> &str {
    &self.def.workflow_id
  }

  pub fn name(&self) -> &str {
    &self.def.name
  }

  pub fn settings(&self) -> &WorkflowSettings {
    &self.def.settings
  }

  /// The definition this graph was built from.
  pub fn definition(&self) -> &WorkflowDef {
    &self.def
  }

  /// Get a node by ID.
  pub fn node(&self, node_id: &str) -> Option<&NodeDef> {
    self.index.get(node_id).map(|&i| &self.def.nodes[i])
  }

  /// All nodes, in declaration order.
  pub fn nodes(&self) -> &[NodeDef] {
    &self.def.nodes
  }

  /// All edges, in declaration order.
  pub fn edges(&self) -> &[Edge] {
    &self.def.edges
  }

  /// Trigger nodes with no incoming edge, in declaration order.
  pub fn entry_points(&self) -> impl Iterator<Item = &NodeDef> {
    self.entry_points.iter().map(|&i| &self.def.nodes[i])
  }

  /// Edges leaving a node, in declaration order.
  pub fn outgoing(&self, node_id: &str) -> impl Iterator<Item = &Edge> {
    self
      .outgoing
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
      .iter()
      .map(|&i| &self.def.edges[i])
  }

  /// Edges entering a node, in declaration order.
  pub fn incoming(&self, node_id: &str) -> impl Iterator<Item = &Edge> {
    self
      .incoming
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
      .iter()
      .map(|&i| &self.def.edges[i])
  }

  /// Whether a node has more than one incoming edge. Each inbound edge
  /// activates the node independently.
  pub fn is_join_point(&self, node_id: &str) -> bool {
    self.incoming(node_id).nth(1).is_some()
  }

  /// Whether a node has no outgoing edges.
  pub fn is_leaf(&self, node_id: &str) -> bool {
    self.outgoing.get(node_id).is_none_or(|v| v.is_empty())
  }
}

impl TryFrom<WorkflowDef> for Graph {
  type Error = WorkflowError;

  fn try_from(def: WorkflowDef) -> Result<Self, Self::Error> {
    Graph::new(def)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use switchboard_config::{AgentConfig, ToolConfig, TriggerConfig};

  fn trigger(id: &str) -> NodeDef {
    NodeDef::new(id, NodeType::Trigger(TriggerConfig::default()))
  }

  fn agent(id: &str) -> NodeDef {
    NodeDef::new(
      id,
      NodeType::Agent(AgentConfig {
        instructions: "help".to_string(),
        ..Default::default()
      }),
    )
  }

  fn tool(id: &str) -> NodeDef {
    NodeDef::new(
      id,
      NodeType::Tool(ToolConfig {
        name: id.to_string(),
        ..Default::default()
      }),
    )
  }

  #[test]
  fn test_entry_points_in_declaration_order() {
    let def = WorkflowDef::new("wf", "wf")
      .node(trigger("t2"))
      .node(agent("a"))
      .node(trigger("t1"))
      .edge(Edge::new("t1", "a"))
      .edge(Edge::new("t2", "a"));

    let graph = Graph::new(def).unwrap();
    let ids: Vec<_> = graph.entry_points().map(|n| n.node_id.as_str()).collect();
    assert_eq!(ids, vec!["t2", "t1"]);
    assert!(graph.is_join_point("a"));
    assert!(graph.is_leaf("a"));
  }

  #[test]
  fn test_outgoing_in_declaration_order() {
    let def = WorkflowDef::new("wf", "wf")
      .node(trigger("t"))
      .node(agent("a"))
      .node(tool("z"))
      .node(tool("b"))
      .node(tool("m"))
      .edge(Edge::new("t", "a"))
      .edge(Edge::new("a", "z"))
      .edge(Edge::new("a", "b"))
      .edge(Edge::new("a", "m"));

    let graph = Graph::new(def).unwrap();
    let targets: Vec<_> = graph.outgoing("a").map(|e| e.target.as_str()).collect();
    assert_eq!(targets, vec!["z", "b", "m"]);
    assert_eq!(graph.outgoing("m").count(), 0);
    assert_eq!(graph.outgoing("unknown").count(), 0);
    assert_eq!(graph.incoming("b").count(), 1);
    assert!(!graph.is_join_point("b"));
  }

  #[test]
  fn test_cycles_are_allowed() {
    let def = WorkflowDef::new("wf", "wf")
      .node(trigger("t"))
      .node(agent("a"))
      .node(agent("b"))
      .edge(Edge::new("t", "a"))
      .edge(Edge::new("a", "b"))
      .edge(Edge::new("b", "a"));

    let graph = Graph::new(def).unwrap();
    assert_eq!(graph.entry_points().count(), 1);
    assert!(graph.is_join_point("a"));
  }

  #[test]
  fn test_invalid_definition_is_rejected() {
    let def = WorkflowDef::new("wf", "wf")
      .node(trigger("t"))
      .edge(Edge::new("t", "missing"));

    let err = Graph::new(def).unwrap_err();
    assert_eq!(err.validation().errors.len(), 1);
    assert_eq!(
      err.to_string(),
      "invalid workflow graph: edge 0 references unknown node 'missing'"
    );
  }

  #[test]
  fn test_node_lookup() {
    let graph = Graph::try_from(WorkflowDef::new("wf", "Named").node(trigger("t"))).unwrap();
    assert_eq!(graph.name(), "Named");
    assert_eq!(graph.node("t").map(|n| n.kind()), Some(switchboard_config::NodeKind::Trigger));
    assert!(graph.node("x").is_none());
  }
}
