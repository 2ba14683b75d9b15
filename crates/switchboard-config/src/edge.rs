use serde::{Deserialize, Serialize};

/// Name of the port every non-trigger node consumes from.
pub const INPUT_PORT: &str = "input";

/// Name of the port every node produces on.
pub const OUTPUT_PORT: &str = "output";

/// A directed connection `(source, source_port) -> (target, target_port)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  pub source: String,
  #[serde(default = "default_source_port")]
  pub source_port: String,
  pub target: String,
  #[serde(default = "default_target_port")]
  pub target_port: String,
}

impl Edge {
  /// Connect `source.output` to `target.input`.
  pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
    Self {
      id: None,
      source: source.into(),
      source_port: OUTPUT_PORT.to_string(),
      target: target.into(),
      target_port: INPUT_PORT.to_string(),
    }
  }

  /// Connect a named source port (e.g. an agent's handoff port) to `target.input`.
  pub fn from_port(
    source: impl Into<String>,
    source_port: impl Into<String>,
    target: impl Into<String>,
  ) -> Self {
    Self {
      source_port: source_port.into(),
      ..Self::new(source, target)
    }
  }

  /// Whether two edges connect the same endpoints through the same ports.
  pub fn same_endpoints(&self, other: &Edge) -> bool {
    self.source == other.source
      && self.source_port == other.source_port
      && self.target == other.target
      && self.target_port == other.target_port
  }
}

fn default_source_port() -> String {
  OUTPUT_PORT.to_string()
}

fn default_target_port() -> String {
  INPUT_PORT.to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_ports_default_when_omitted() {
    let edge: Edge = serde_json::from_str(r#"{"source": "a", "target": "b"}"#).unwrap();
    assert_eq!(edge, Edge::new("a", "b"));
  }

  #[test]
  fn test_same_endpoints_ignores_id() {
    let mut a = Edge::new("a", "b");
    a.id = Some("conn-1".to_string());
    let b = Edge::new("a", "b");
    assert!(a.same_endpoints(&b));
    assert!(!a.same_endpoints(&Edge::from_port("a", "escalate", "b")));
  }
}
