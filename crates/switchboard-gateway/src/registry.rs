//! Runs of this process, addressable by ID.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::Serialize;
use switchboard_config::WorkflowDef;
use switchboard_runtime::{ExecutionRun, RunEvent, RunHandle, RunStatus, Runtime, RuntimeError};
use switchboard_workflow::{Graph, ValidationResult};
use tracing::{debug, info};

use crate::config::DEFAULT_MAX_RETAINED_RUNS;

/// Listing entry for a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
  pub id: String,
  pub workflow_id: String,
  pub status: RunStatus,
  pub started_at: DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub ended_at: Option<DateTime<Utc>>,
  pub trace_count: usize,
}

impl From<&ExecutionRun> for RunSummary {
  fn from(run: &ExecutionRun) -> Self {
    Self {
      id: run.id.clone(),
      workflow_id: run.workflow_id.clone(),
      status: run.status,
      started_at: run.started_at,
      ended_at: run.ended_at,
      trace_count: run.traces.len(),
    }
  }
}

/// Submits runs to a [`Runtime`] and keeps their handles.
///
/// At most `max_retained` runs are kept. Once over the limit, the oldest
/// finished runs are evicted; runs still in flight are never evicted.
#[derive(Clone)]
pub struct RunRegistry {
  runtime: Runtime,
  max_retained: usize,
  runs: Arc<RwLock<Runs>>,
}

#[derive(Default)]
struct Runs {
  handles: HashMap<String, RunHandle>,
  /// Run IDs in submission order.
  order: VecDeque<String>,
}

impl Runs {
  fn evict_finished(&mut self, max_retained: usize) {
    let mut excess = self.handles.len().saturating_sub(max_retained);
    if excess == 0 {
      return;
    }

    let handles = &mut self.handles;
    self.order.retain(|run_id| {
      if excess == 0 {
        return true;
      }
      match handles.get(run_id).map(|handle| handle.status().is_terminal()) {
        Some(true) => {
          handles.remove(run_id);
          excess -= 1;
          debug!(run_id = %run_id, "run_evicted");
          false
        }
        Some(false) => true,
        None => false,
      }
    });
  }
}

impl RunRegistry {
  pub fn new(runtime: Runtime) -> Self {
    Self {
      runtime,
      max_retained: DEFAULT_MAX_RETAINED_RUNS,
      runs: Arc::new(RwLock::new(Runs::default())),
    }
  }

  pub fn with_retention(mut self, max_retained: usize) -> Self {
    self.max_retained = max_retained.max(1);
    self
  }

  /// Validate `def` and start a run. Returns the run ID, or every structural
  /// violation if the definition is invalid. Must be called within a tokio
  /// runtime.
  pub fn submit(
    &self,
    def: WorkflowDef,
    input: serde_json::Value,
  ) -> Result<String, ValidationResult> {
    let graph = Graph::new(def).map_err(|e| e.validation().clone())?;
    let handle = self.runtime.start(graph, input);
    let run_id = handle.id();

    info!(run_id = %run_id, "run_submitted");
    let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
    runs.handles.insert(run_id.clone(), handle);
    runs.order.push_back(run_id.clone());
    runs.evict_finished(self.max_retained);

    Ok(run_id)
  }

  pub fn handle(&self, run_id: &str) -> Result<RunHandle, RuntimeError> {
    self
      .runs
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .handles
      .get(run_id)
      .cloned()
      .ok_or_else(|| RuntimeError::UnknownRun {
        run_id: run_id.to_string(),
      })
  }

  /// The run as recorded so far.
  pub fn get(&self, run_id: &str) -> Result<ExecutionRun, RuntimeError> {
    Ok(self.handle(run_id)?.snapshot())
  }

  /// Events of a run from its first trace. Each call gets its own stream.
  pub fn subscribe(&self, run_id: &str) -> Result<BoxStream<'static, RunEvent>, RuntimeError> {
    Ok(self.handle(run_id)?.subscribe())
  }

  /// Request cancellation. `Ok(false)` if the run had already ended.
  pub fn cancel(&self, run_id: &str) -> Result<bool, RuntimeError> {
    Ok(self.handle(run_id)?.cancel())
  }

  /// All runs, oldest first.
  pub fn list(&self) -> Vec<RunSummary> {
    let mut runs: Vec<RunSummary> = self
      .runs
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .handles
      .values()
      .map(|handle| RunSummary::from(&handle.snapshot()))
      .collect();
    runs.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.id.cmp(&b.id)));
    runs
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use futures::StreamExt;
  use serde_json::json;
  use switchboard_config::{Edge, NodeDef, NodeType, TriggerConfig};
  use std::time::Duration;
  use switchboard_executor::NodeExecutors;
  use switchboard_executor::scripted::ScriptedClient;
  use switchboard_runtime::RuntimeConfig;

  fn registry() -> RunRegistry {
    RunRegistry::new(Runtime::simulated(RuntimeConfig::default()))
  }

  #[tokio::test]
  async fn test_submit_and_follow() {
    let registry = registry();
    let run_id = registry
      .submit(
        switchboard_config::customer_support(),
        json!({"message": "hi", "query": "hours", "title": "Hours", "description": "Opening hours"}),
      )
      .unwrap();

    let events: Vec<RunEvent> = registry.subscribe(&run_id).unwrap().collect().await;
    assert!(matches!(
      events.last(),
      Some(RunEvent::Complete { status: RunStatus::Completed, .. })
    ));

    let run = registry.get(&run_id).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(registry.list().len(), 1);
    assert_eq!(registry.list()[0].trace_count, run.traces.len());
    assert!(!registry.cancel(&run_id).unwrap());
  }

  #[tokio::test]
  async fn test_submit_rejects_invalid_graph() {
    let registry = registry();
    let def = WorkflowDef::new("wf", "Broken")
      .node(NodeDef::new("t", NodeType::Trigger(TriggerConfig::default())))
      .edge(Edge::new("t", "missing"));

    let validation = registry.submit(def, json!({})).unwrap_err();
    assert!(!validation.is_valid());
    assert!(registry.list().is_empty());
  }

  #[tokio::test]
  async fn test_evicts_oldest_finished_runs() {
    let registry = registry().with_retention(2);
    let mut ids = Vec::new();
    for _ in 0..3 {
      let run_id = registry
        .submit(switchboard_config::content_creation(), json!({"topic": "rust"}))
        .unwrap();
      registry.handle(&run_id).unwrap().wait().await;
      ids.push(run_id);
    }

    assert_eq!(registry.list().len(), 2);
    assert!(registry.get(&ids[0]).is_err());
    assert!(registry.get(&ids[1]).is_ok());
    assert!(registry.get(&ids[2]).is_ok());
  }

  #[tokio::test]
  async fn test_in_flight_runs_are_not_evicted() {
    let client = Arc::new(ScriptedClient::new().delay("agent-1", Duration::from_secs(3600)));
    let runtime = Runtime::new(
      NodeExecutors::new(client.clone(), client),
      RuntimeConfig::default(),
    );
    let registry = RunRegistry::new(runtime).with_retention(1);

    let first = registry
      .submit(switchboard_config::customer_support(), json!({}))
      .unwrap();
    let second = registry
      .submit(switchboard_config::customer_support(), json!({}))
      .unwrap();

    assert!(registry.get(&first).is_ok());
    assert!(registry.get(&second).is_ok());
    registry.cancel(&first).unwrap();
    registry.cancel(&second).unwrap();
  }

  #[tokio::test]
  async fn test_unknown_run() {
    let registry = registry();
    assert_eq!(
      registry.get("nope").unwrap_err(),
      RuntimeError::UnknownRun {
        run_id: "nope".to_string()
      }
    );
    assert!(registry.cancel("nope").is_err());
    assert!(registry.subscribe("nope").is_err());
  }
}
