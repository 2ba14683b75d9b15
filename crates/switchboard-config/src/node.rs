use serde::{Deserialize, Serialize};

use crate::enums::{NodeKind, ParameterType, RiskLevel, ToolCategory, TriggerType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDef {
  pub node_id: String,
  /// Display name. Falls back to `node_id` when absent.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(flatten)]
  pub node_type: NodeType,
}

impl NodeDef {
  pub fn new(node_id: impl Into<String>, node_type: NodeType) -> Self {
    Self {
      node_id: node_id.into(),
      name: None,
      node_type,
    }
  }

  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  pub fn kind(&self) -> NodeKind {
    self.node_type.kind()
  }

  pub fn display_name(&self) -> &str {
    self.name.as_deref().unwrap_or(&self.node_id)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeType {
  /// Entry node. Has no input port and exactly one output port.
  Trigger(TriggerConfig),
  /// A reasoning agent.
  Agent(AgentConfig),
  /// A callable tool.
  Tool(ToolConfig),
  /// Control transfer from one agent to another.
  Handoff(HandoffConfig),
}

impl NodeType {
  pub fn kind(&self) -> NodeKind {
    match self {
      NodeType::Trigger(_) => NodeKind::Trigger,
      NodeType::Agent(_) => NodeKind::Agent,
      NodeType::Tool(_) => NodeKind::Tool,
      NodeType::Handoff(_) => NodeKind::Handoff,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TriggerConfig {
  #[serde(default)]
  pub trigger_type: TriggerType,
  /// Opaque payload template. Carried, not interpreted by the engine.
  #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
  pub config: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AgentConfig {
  #[serde(default)]
  pub instructions: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub model: Option<String>,
  /// Tool references by tool name.
  #[serde(default)]
  pub tools: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub temperature: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_tokens: Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub output_type: Option<String>,
  /// Named handoff ports. Each entry is exposed as an extra output port.
  #[serde(default)]
  pub handoffs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
  pub name: String,
  #[serde(rename = "type")]
  pub param_type: ParameterType,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub required: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub default: Option<serde_json::Value>,
}

impl ToolParameter {
  pub fn required(name: impl Into<String>, param_type: ParameterType) -> Self {
    Self {
      name: name.into(),
      param_type,
      description: String::new(),
      required: true,
      default: None,
    }
  }

  pub fn optional(
    name: impl Into<String>,
    param_type: ParameterType,
    default: Option<serde_json::Value>,
  ) -> Self {
    Self {
      name: name.into(),
      param_type,
      description: String::new(),
      required: false,
      default,
    }
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = description.into();
    self
  }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ToolConfig {
  pub name: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub parameters: Vec<ToolParameter>,
  #[serde(default)]
  pub category: ToolCategory,
  #[serde(default)]
  pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffConfig {
  pub from_agent: String,
  pub to_agent: String,
  /// Opaque gate, evaluated by the injected handoff gate.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub condition: Option<String>,
  /// When false, downstream activations no longer see the original run input.
  #[serde(default = "default_preserve_context")]
  pub preserve_context: bool,
  #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
  pub context: serde_json::Value,
}

impl HandoffConfig {
  pub fn new(from_agent: impl Into<String>, to_agent: impl Into<String>) -> Self {
    Self {
      from_agent: from_agent.into(),
      to_agent: to_agent.into(),
      condition: None,
      preserve_context: true,
      context: serde_json::Value::Null,
    }
  }
}

fn default_preserve_context() -> bool {
  true
}
