//! Per-kind node executors.

use std::sync::Arc;

use switchboard_config::{NodeDef, NodeType, TriggerConfig};
use tracing::debug;

use crate::arguments::resolve_arguments;
use crate::client::{HandoffGate, ReasoningClient, ToolClient};
use crate::outcome::{ActivationInput, ExecutionOutcome};
use crate::simulated::{EchoTools, OpenGate, SimulatedReasoner};

/// Wraps the run input. Always succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerExecutor;

impl TriggerExecutor {
  pub fn execute(&self, trigger: &TriggerConfig, input: &ActivationInput) -> ExecutionOutcome {
    ExecutionOutcome::success(serde_json::json!({
      "triggered": true,
      "payload": input.payload,
    }))
    .with_metadata(serde_json::json!({ "trigger_type": trigger.trigger_type }))
  }
}

/// Delegates to the injected reasoning client.
#[derive(Clone)]
pub struct AgentExecutor {
  client: Arc<dyn ReasoningClient>,
}

impl AgentExecutor {
  pub fn new(client: Arc<dyn ReasoningClient>) -> Self {
    Self { client }
  }

  pub async fn execute(&self, node: &NodeDef, input: &ActivationInput) -> ExecutionOutcome {
    let NodeType::Agent(agent) = &node.node_type else {
      return ExecutionOutcome::failure(format!("node '{}' is not an agent", node.node_id));
    };
    self.client.respond(node, agent, input).await
  }
}

/// Resolves arguments against the parameter schema, then delegates to the
/// injected tool client.
#[derive(Clone)]
pub struct ToolExecutor {
  client: Arc<dyn ToolClient>,
}

impl ToolExecutor {
  pub fn new(client: Arc<dyn ToolClient>) -> Self {
    Self { client }
  }

  pub async fn execute(&self, node: &NodeDef, input: &ActivationInput) -> ExecutionOutcome {
    let NodeType::Tool(tool) = &node.node_type else {
      return ExecutionOutcome::failure(format!("node '{}' is not a tool", node.node_id));
    };

    let context = input.context.as_deref();
    let arguments = match resolve_arguments(&tool.parameters, &input.payload, context) {
      Ok(arguments) => arguments,
      Err(e) => {
        debug!(node_id = %node.node_id, error = %e, "tool argument resolution failed");
        return ExecutionOutcome::failure(e.to_string());
      }
    };

    self
      .client
      .invoke(node, tool, &arguments, input)
      .await
      .with_metadata(serde_json::json!({
        "risk_level": tool.risk_level,
        "arguments": arguments,
      }))
  }
}

/// Forwards the upstream output once the gate allows the transfer.
#[derive(Clone)]
pub struct HandoffExecutor {
  gate: Arc<dyn HandoffGate>,
}

impl HandoffExecutor {
  pub fn new(gate: Arc<dyn HandoffGate>) -> Self {
    Self { gate }
  }

  pub async fn execute(&self, node: &NodeDef, input: &ActivationInput) -> ExecutionOutcome {
    let NodeType::Handoff(handoff) = &node.node_type else {
      return ExecutionOutcome::failure(format!("node '{}' is not a handoff", node.node_id));
    };

    if !self.gate.allows(node, handoff, input).await {
      let condition = handoff.condition.as_deref().unwrap_or_default();
      return ExecutionOutcome::failure(format!("handoff condition '{}' not satisfied", condition));
    }

    ExecutionOutcome::success(input.payload.clone()).with_metadata(serde_json::json!({
      "from_agent": handoff.from_agent,
      "to_agent": handoff.to_agent,
      "preserve_context": handoff.preserve_context,
      "condition": handoff.condition,
    }))
  }
}

/// One executor per node kind.
#[derive(Clone)]
pub struct NodeExecutors {
  pub trigger: TriggerExecutor,
  pub agent: AgentExecutor,
  pub tool: ToolExecutor,
  pub handoff: HandoffExecutor,
}

impl NodeExecutors {
  /// Executors backed by the given clients, with every handoff gate open.
  pub fn new(reasoning: Arc<dyn ReasoningClient>, tools: Arc<dyn ToolClient>) -> Self {
    Self {
      trigger: TriggerExecutor,
      agent: AgentExecutor::new(reasoning),
      tool: ToolExecutor::new(tools),
      handoff: HandoffExecutor::new(Arc::new(OpenGate)),
    }
  }

  /// Executors that never leave the process.
  pub fn simulated() -> Self {
    Self::new(Arc::new(SimulatedReasoner), Arc::new(EchoTools))
  }

  pub fn with_gate(mut self, gate: Arc<dyn HandoffGate>) -> Self {
    self.handoff = HandoffExecutor::new(gate);
    self
  }

  /// Run the executor matching the node's kind.
  pub async fn execute(&self, node: &NodeDef, input: &ActivationInput) -> ExecutionOutcome {
    match &node.node_type {
      NodeType::Trigger(trigger) => self.trigger.execute(trigger, input),
      NodeType::Agent(_) => self.agent.execute(node, input).await,
      NodeType::Tool(_) => self.tool.execute(node, input).await,
      NodeType::Handoff(_) => self.handoff.execute(node, input).await,
    }
  }
}

impl Default for NodeExecutors {
  fn default() -> Self {
    Self::simulated()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::scripted::{ScriptedClient, ScriptedGate};
  use serde_json::json;
  use switchboard_config::{
    AgentConfig, HandoffConfig, ParameterType, RiskLevel, ToolConfig, ToolParameter, TriggerType,
  };

  fn trigger() -> NodeDef {
    NodeDef::new(
      "trigger-1",
      NodeType::Trigger(TriggerConfig {
        trigger_type: TriggerType::Webhook,
        ..Default::default()
      }),
    )
  }

  fn tool() -> NodeDef {
    NodeDef::new(
      "tool-1",
      NodeType::Tool(ToolConfig {
        name: "create_ticket".to_string(),
        parameters: vec![ToolParameter::required("title", ParameterType::String)],
        risk_level: RiskLevel::Medium,
        ..Default::default()
      }),
    )
  }

  fn handoff(condition: Option<&str>) -> NodeDef {
    let mut config = HandoffConfig::new("agent-1", "agent-2");
    config.condition = condition.map(str::to_string);
    NodeDef::new("handoff-1", NodeType::Handoff(config))
  }

  #[tokio::test]
  async fn test_trigger_wraps_payload() {
    let outcome = NodeExecutors::simulated()
      .execute(&trigger(), &ActivationInput::new(json!({"message": "hi"}), None))
      .await;

    assert_eq!(
      outcome,
      ExecutionOutcome::Success {
        output: json!({"triggered": true, "payload": {"message": "hi"}}),
        metadata: Some(json!({"trigger_type": "webhook"})),
      }
    );
  }

  #[tokio::test]
  async fn test_agent_delegates_to_client() {
    let client = Arc::new(ScriptedClient::new().succeed("agent-1", json!("ok")));
    let executors = NodeExecutors::new(client.clone(), client.clone());
    let node = NodeDef::new("agent-1", NodeType::Agent(AgentConfig::default()));
    let input = ActivationInput::new(json!({"q": 1}), None);

    let outcome = executors.execute(&node, &input).await;

    assert_eq!(outcome, ExecutionOutcome::success(json!("ok")));
    assert_eq!(client.inputs("agent-1"), vec![json!({"q": 1})]);
  }

  #[tokio::test]
  async fn test_tool_records_arguments_and_risk() {
    let outcome = NodeExecutors::simulated()
      .execute(&tool(), &ActivationInput::new(json!({"title": "Broken"}), None))
      .await;

    let ExecutionOutcome::Success { output, metadata } = outcome else {
      panic!("expected success");
    };
    assert_eq!(
      output,
      json!({"tool": "create_ticket", "arguments": {"title": "Broken"}})
    );
    assert_eq!(
      metadata,
      Some(json!({"risk_level": "medium", "arguments": {"title": "Broken"}}))
    );
  }

  #[tokio::test]
  async fn test_tool_missing_argument_is_not_retryable() {
    let client = Arc::new(ScriptedClient::new());
    let executors = NodeExecutors::new(client.clone(), client.clone());

    let outcome = executors
      .execute(&tool(), &ActivationInput::new(json!({}), None))
      .await;

    assert_eq!(
      outcome,
      ExecutionOutcome::failure("missing required parameter 'title'")
    );
    assert_eq!(client.calls("tool-1"), 0);
  }

  #[tokio::test]
  async fn test_handoff_passes_payload_through() {
    let outcome = NodeExecutors::simulated()
      .execute(&handoff(None), &ActivationInput::new(json!("draft"), None))
      .await;

    let ExecutionOutcome::Success { output, metadata } = outcome else {
      panic!("expected success");
    };
    assert_eq!(output, json!("draft"));
    assert_eq!(
      metadata,
      Some(json!({
        "from_agent": "agent-1",
        "to_agent": "agent-2",
        "preserve_context": true,
        "condition": null,
      }))
    );
  }

  #[tokio::test]
  async fn test_closed_gate_fails_handoff() {
    let executors = NodeExecutors::simulated().with_gate(Arc::new(ScriptedGate::closed(["handoff-1"])));

    let outcome = executors
      .execute(&handoff(Some("content_ready")), &ActivationInput::new(json!("draft"), None))
      .await;

    assert_eq!(
      outcome,
      ExecutionOutcome::failure("handoff condition 'content_ready' not satisfied")
    );
  }
}
