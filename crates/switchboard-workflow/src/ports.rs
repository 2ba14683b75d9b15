use switchboard_config::{INPUT_PORT, NodeDef, NodeType, OUTPUT_PORT};

/// Declared input ports of a node. Triggers have none.
pub fn input_ports(node: &NodeDef) -> Vec<&str> {
  match &node.node_type {
    NodeType::Trigger(_) => Vec::new(),
    NodeType::Agent(_) | NodeType::Tool(_) | NodeType::Handoff(_) => vec![INPUT_PORT],
  }
}

/// Declared output ports of a node. Agents add one port per configured handoff.
pub fn output_ports(node: &NodeDef) -> Vec<&str> {
  let mut ports = vec![OUTPUT_PORT];
  if let NodeType::Agent(agent) = &node.node_type {
    ports.extend(agent.handoffs.iter().map(String::as_str));
  }
  ports
}
