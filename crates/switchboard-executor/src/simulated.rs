//! In-process clients that never call out.
//!
//! The reasoner renders the agent's instructions as a template against the
//! activation, the tool client echoes its arguments and the gate is always
//! open. Useful for demos, the CLI and tests that only care about traversal.

use async_trait::async_trait;
use minijinja::Environment;
use switchboard_config::{AgentConfig, HandoffConfig, NodeDef, ToolConfig};

use crate::client::{HandoffGate, ReasoningClient, ToolClient};
use crate::outcome::{ActivationInput, ExecutionOutcome};

/// Renders `instructions` with `input` and `context` in scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedReasoner;

impl SimulatedReasoner {
  pub fn render(
    &self,
    instructions: &str,
    input: &ActivationInput,
  ) -> Result<String, minijinja::Error> {
    let env = Environment::new();
    env.render_str(
      instructions,
      serde_json::json!({
        "input": input.payload,
        "context": input.context_value(),
      }),
    )
  }
}

#[async_trait]
impl ReasoningClient for SimulatedReasoner {
  async fn respond(
    &self,
    node: &NodeDef,
    agent: &AgentConfig,
    input: &ActivationInput,
  ) -> ExecutionOutcome {
    match self.render(&agent.instructions, input) {
      Ok(response) => ExecutionOutcome::success(serde_json::json!({
        "agent": node.display_name(),
        "model": agent.model,
        "response": response,
      })),
      Err(e) => ExecutionOutcome::failure(format!("failed to render instructions: {}", e)),
    }
  }
}

/// Returns the tool name and resolved arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoTools;

#[async_trait]
impl ToolClient for EchoTools {
  async fn invoke(
    &self,
    _node: &NodeDef,
    tool: &ToolConfig,
    arguments: &serde_json::Value,
    _input: &ActivationInput,
  ) -> ExecutionOutcome {
    ExecutionOutcome::success(serde_json::json!({
      "tool": tool.name,
      "arguments": arguments,
    }))
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OpenGate;

#[async_trait]
impl HandoffGate for OpenGate {
  async fn allows(&self, _node: &NodeDef, _handoff: &HandoffConfig, _input: &ActivationInput) -> bool {
    true
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use std::sync::Arc;
  use switchboard_config::NodeType;

  fn agent(instructions: &str) -> (NodeDef, AgentConfig) {
    let config = AgentConfig {
      instructions: instructions.to_string(),
      model: Some("gpt-4o".to_string()),
      ..Default::default()
    };
    let node = NodeDef::new("agent-1", NodeType::Agent(config.clone())).with_name("Support Agent");
    (node, config)
  }

  #[tokio::test]
  async fn test_renders_instructions() {
    let (node, config) = agent("Reply to {{ input.payload.message }} for {{ context.user }}");
    let input = ActivationInput::new(
      json!({"triggered": true, "payload": {"message": "refund"}}),
      Some(Arc::new(json!({"user": "ada"}))),
    );

    let outcome = SimulatedReasoner.respond(&node, &config, &input).await;

    assert_eq!(
      outcome,
      ExecutionOutcome::success(json!({
        "agent": "Support Agent",
        "model": "gpt-4o",
        "response": "Reply to refund for ada",
      }))
    );
  }

  #[tokio::test]
  async fn test_missing_values_render_empty() {
    let (node, config) = agent("[{{ input.missing }}]");
    let outcome = SimulatedReasoner
      .respond(&node, &config, &ActivationInput::new(json!({}), None))
      .await;

    let ExecutionOutcome::Success { output, .. } = outcome else {
      panic!("expected success");
    };
    assert_eq!(output["response"], json!("[]"));
  }

  #[tokio::test]
  async fn test_bad_template_fails() {
    let (node, config) = agent("{{ unclosed");
    let outcome = SimulatedReasoner
      .respond(&node, &config, &ActivationInput::new(json!(null), None))
      .await;

    assert!(!outcome.is_success());
    assert!(!outcome.is_retryable());
  }
}
