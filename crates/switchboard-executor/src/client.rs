//! Injection points for work that happens outside the engine.

use async_trait::async_trait;
use switchboard_config::{AgentConfig, HandoffConfig, NodeDef, ToolConfig};

use crate::outcome::{ActivationInput, ExecutionOutcome};

/// Produces an agent's response. A production deployment calls a language
/// model here.
#[async_trait]
pub trait ReasoningClient: Send + Sync {
  async fn respond(
    &self,
    node: &NodeDef,
    agent: &AgentConfig,
    input: &ActivationInput,
  ) -> ExecutionOutcome;
}

/// Invokes a tool with arguments already resolved against its parameter schema.
#[async_trait]
pub trait ToolClient: Send + Sync {
  async fn invoke(
    &self,
    node: &NodeDef,
    tool: &ToolConfig,
    arguments: &serde_json::Value,
    input: &ActivationInput,
  ) -> ExecutionOutcome;
}

/// Decides whether a handoff's condition is satisfied.
#[async_trait]
pub trait HandoffGate: Send + Sync {
  async fn allows(&self, node: &NodeDef, handoff: &HandoffConfig, input: &ActivationInput) -> bool;
}
