//! Clients with per-node canned outcomes, for deterministic tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use switchboard_config::{AgentConfig, HandoffConfig, NodeDef, ToolConfig};

use crate::client::{HandoffGate, ReasoningClient, ToolClient};
use crate::outcome::{ActivationInput, ExecutionOutcome};

#[derive(Debug, Default)]
struct Script {
  /// Outcome per call. The last entry repeats once exhausted.
  outcomes: Vec<ExecutionOutcome>,
  delay: Option<Duration>,
}

/// Serves both agents and tools. Unscripted nodes echo their payload.
#[derive(Debug, Default)]
pub struct ScriptedClient {
  scripts: HashMap<String, Script>,
  inputs: Mutex<HashMap<String, Vec<serde_json::Value>>>,
}

impl ScriptedClient {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn succeed(self, node_id: &str, output: serde_json::Value) -> Self {
    self.sequence(node_id, vec![ExecutionOutcome::success(output)])
  }

  pub fn fail(self, node_id: &str, reason: &str) -> Self {
    self.sequence(node_id, vec![ExecutionOutcome::failure(reason)])
  }

  pub fn fail_retryable(self, node_id: &str, reason: &str) -> Self {
    self.sequence(node_id, vec![ExecutionOutcome::retryable(reason)])
  }

  pub fn sequence(mut self, node_id: &str, outcomes: Vec<ExecutionOutcome>) -> Self {
    self.scripts.entry(node_id.to_string()).or_default().outcomes = outcomes;
    self
  }

  /// Sleep before every call to `node_id` resolves.
  pub fn delay(mut self, node_id: &str, delay: Duration) -> Self {
    self.scripts.entry(node_id.to_string()).or_default().delay = Some(delay);
    self
  }

  /// Number of invocations seen for `node_id`, retries included.
  pub fn calls(&self, node_id: &str) -> usize {
    self.inputs(node_id).len()
  }

  /// Payloads received by `node_id`, in call order.
  pub fn inputs(&self, node_id: &str) -> Vec<serde_json::Value> {
    self
      .inputs
      .lock()
      .map(|inputs| inputs.get(node_id).cloned().unwrap_or_default())
      .unwrap_or_default()
  }

  async fn outcome(&self, node_id: &str, input: &ActivationInput) -> ExecutionOutcome {
    let call = match self.inputs.lock() {
      Ok(mut inputs) => {
        let seen = inputs.entry(node_id.to_string()).or_default();
        seen.push(input.payload.clone());
        seen.len() - 1
      }
      Err(_) => return ExecutionOutcome::failure("scripted client poisoned"),
    };

    let Some(script) = self.scripts.get(node_id) else {
      return ExecutionOutcome::success(input.payload.clone());
    };

    if let Some(delay) = script.delay {
      tokio::time::sleep(delay).await;
    }

    script
      .outcomes
      .get(call)
      .or_else(|| script.outcomes.last())
      .cloned()
      .unwrap_or_else(|| ExecutionOutcome::success(input.payload.clone()))
  }
}

#[async_trait]
impl ReasoningClient for ScriptedClient {
  async fn respond(
    &self,
    node: &NodeDef,
    _agent: &AgentConfig,
    input: &ActivationInput,
  ) -> ExecutionOutcome {
    self.outcome(&node.node_id, input).await
  }
}

#[async_trait]
impl ToolClient for ScriptedClient {
  async fn invoke(
    &self,
    node: &NodeDef,
    _tool: &ToolConfig,
    _arguments: &serde_json::Value,
    input: &ActivationInput,
  ) -> ExecutionOutcome {
    self.outcome(&node.node_id, input).await
  }
}

/// Closes the gate for the listed handoff nodes.
#[derive(Debug, Default)]
pub struct ScriptedGate {
  closed: HashSet<String>,
}

impl ScriptedGate {
  pub fn closed<I, S>(node_ids: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      closed: node_ids.into_iter().map(Into::into).collect(),
    }
  }
}

#[async_trait]
impl HandoffGate for ScriptedGate {
  async fn allows(&self, node: &NodeDef, _handoff: &HandoffConfig, _input: &ActivationInput) -> bool {
    !self.closed.contains(&node.node_id)
  }
}
