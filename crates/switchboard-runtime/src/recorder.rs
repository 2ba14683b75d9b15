//! Append-only trace log for one run.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use switchboard_config::{NodeDef, NodeKind};
use tokio::sync::watch;

use crate::run::{ExecutionRun, RunStatus, elapsed_ms};
use crate::trace::{Trace, TracePhase, TraceStatus};

/// Ticket for an activation whose start trace has been recorded.
#[derive(Debug, Clone)]
pub struct OpenActivation {
  pub node_id: String,
  pub node_kind: NodeKind,
  /// Sequence number of the start trace.
  pub sequence: u64,
  pub started_at: DateTime<Utc>,
  input: serde_json::Value,
  /// Position of the start trace in the log.
  index: usize,
}

/// What a subscriber at a given log position sees next.
pub(crate) enum Cursor {
  Trace(Trace),
  Finished {
    run_id: String,
    status: RunStatus,
    output: Option<serde_json::Value>,
    error: Option<String>,
  },
  Waiting,
}

struct RecorderState {
  run: ExecutionRun,
  next_sequence: u64,
  /// node_id -> log positions of unmatched start traces, most recent last.
  open: HashMap<String, Vec<usize>>,
  sealed: bool,
}

/// Owns a run's trace log and status.
///
/// Sequence numbers are assigned under one lock, so the log is a total order
/// even when branches record concurrently. Once the run is terminal the
/// recorder is sealed and further records are dropped.
pub struct TraceRecorder {
  state: Mutex<RecorderState>,
  changed: watch::Sender<u64>,
}

impl TraceRecorder {
  pub fn new(run: ExecutionRun) -> Self {
    let sealed = run.is_terminal();
    let (changed, _) = watch::channel(0);
    Self {
      state: Mutex::new(RecorderState {
        run,
        next_sequence: 1,
        open: HashMap::new(),
        sealed,
      }),
      changed,
    }
  }

  fn lock(&self) -> MutexGuard<'_, RecorderState> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn notify(&self) {
    self.changed.send_modify(|version| *version += 1);
  }

  pub fn run_id(&self) -> String {
    self.lock().run.id.clone()
  }

  pub fn status(&self) -> RunStatus {
    self.lock().run.status
  }

  #[cfg(test)]
  pub(crate) fn is_sealed(&self) -> bool {
    self.lock().sealed
  }

  /// Copy of the run as recorded so far.
  pub fn snapshot(&self) -> ExecutionRun {
    self.lock().run.clone()
  }

  /// Receiver that changes on every append and on the terminal transition.
  pub fn watch(&self) -> watch::Receiver<u64> {
    self.changed.subscribe()
  }

  /// Number of started activations of `node_id` still waiting for an end.
  #[cfg(test)]
  pub(crate) fn open_activations(&self, node_id: &str) -> usize {
    self.lock().open.get(node_id).map_or(0, Vec::len)
  }

  /// `Pending -> Running`. Returns false if the run already left `Pending`.
  pub fn mark_running(&self) -> bool {
    let mut state = self.lock();
    if state.run.status != RunStatus::Pending {
      return false;
    }
    state.run.status = RunStatus::Running;
    drop(state);
    self.notify();
    true
  }

  /// Record a start trace. `None` once the recorder is sealed.
  pub fn start(&self, node: &NodeDef, input: serde_json::Value) -> Option<OpenActivation> {
    let mut state = self.lock();
    if state.sealed {
      return None;
    }

    let sequence = state.next_sequence;
    state.next_sequence += 1;
    let index = state.run.traces.len();
    let started_at = Utc::now();

    state.run.traces.push(Trace {
      id: uuid::Uuid::new_v4().to_string(),
      sequence,
      activation: sequence,
      node_id: node.node_id.clone(),
      node_kind: node.kind(),
      phase: TracePhase::Start,
      status: TraceStatus::Running,
      input: input.clone(),
      output: None,
      error: None,
      started_at,
      ended_at: None,
      duration_ms: None,
      metadata: None,
    });
    state
      .open
      .entry(node.node_id.clone())
      .or_default()
      .push(index);
    drop(state);
    self.notify();

    Some(OpenActivation {
      node_id: node.node_id.clone(),
      node_kind: node.kind(),
      sequence,
      started_at,
      input,
      index,
    })
  }

  pub fn succeed(
    &self,
    activation: &OpenActivation,
    output: serde_json::Value,
    metadata: Option<serde_json::Value>,
  ) -> Option<Trace> {
    self.end(activation, TraceStatus::Success, Some(output), None, metadata)
  }

  pub fn fail(
    &self,
    activation: &OpenActivation,
    error: impl Into<String>,
    metadata: Option<serde_json::Value>,
  ) -> Option<Trace> {
    self.end(activation, TraceStatus::Error, None, Some(error.into()), metadata)
  }

  /// Record the end trace matching `activation` and back-fill the duration
  /// onto its start trace. `None` if sealed or the activation already ended.
  fn end(
    &self,
    activation: &OpenActivation,
    status: TraceStatus,
    output: Option<serde_json::Value>,
    error: Option<String>,
    metadata: Option<serde_json::Value>,
  ) -> Option<Trace> {
    let mut state = self.lock();
    if state.sealed {
      return None;
    }

    let stack = state.open.get_mut(&activation.node_id)?;
    let position = stack.iter().rposition(|&i| i == activation.index)?;
    stack.remove(position);

    let ended_at = Utc::now();
    let duration_ms = elapsed_ms(activation.started_at, ended_at);
    if let Some(start) = state.run.traces.get_mut(activation.index) {
      start.ended_at = Some(ended_at);
      start.duration_ms = Some(duration_ms);
    }

    let sequence = state.next_sequence;
    state.next_sequence += 1;
    let trace = Trace {
      id: uuid::Uuid::new_v4().to_string(),
      sequence,
      activation: activation.sequence,
      node_id: activation.node_id.clone(),
      node_kind: activation.node_kind,
      phase: TracePhase::End,
      status,
      input: activation.input.clone(),
      output,
      error,
      started_at: activation.started_at,
      ended_at: Some(ended_at),
      duration_ms: Some(duration_ms),
      metadata,
    };
    state.run.traces.push(trace.clone());
    drop(state);
    self.notify();

    Some(trace)
  }

  /// Move the run to a terminal status and seal the log.
  ///
  /// Returns false if the run was already terminal; the first call wins.
  pub fn finish(
    &self,
    status: RunStatus,
    output: Option<serde_json::Value>,
    error: Option<String>,
  ) -> bool {
    debug_assert!(status.is_terminal());
    let mut state = self.lock();
    if state.run.is_terminal() {
      return false;
    }
    state.run.status = status;
    state.run.ended_at = Some(Utc::now());
    state.run.output = output;
    state.run.error = error;
    state.sealed = true;
    drop(state);
    self.notify();
    true
  }

  pub(crate) fn cursor(&self, index: usize) -> Cursor {
    let state = self.lock();
    if let Some(trace) = state.run.traces.get(index) {
      return Cursor::Trace(trace.clone());
    }
    if state.run.is_terminal() {
      return Cursor::Finished {
        run_id: state.run.id.clone(),
        status: state.run.status,
        output: state.run.output.clone(),
        error: state.run.error.clone(),
      };
    }
    Cursor::Waiting
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use switchboard_config::{AgentConfig, NodeType};

  fn agent(id: &str) -> NodeDef {
    NodeDef::new(id, NodeType::Agent(AgentConfig::default()))
  }

  fn recorder() -> TraceRecorder {
    TraceRecorder::new(ExecutionRun::new("wf", json!({})))
  }

  #[test]
  fn test_sequences_are_increasing() {
    let recorder = recorder();
    let a = recorder.start(&agent("a"), json!(1)).unwrap();
    let b = recorder.start(&agent("b"), json!(2)).unwrap();
    recorder.succeed(&b, json!("b"), None).unwrap();
    recorder.fail(&a, "boom", None).unwrap();

    let run = recorder.snapshot();
    let sequences: Vec<u64> = run.traces.iter().map(|t| t.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3, 4]);

    let ends: Vec<(&str, u64, TraceStatus)> = run
      .end_traces()
      .map(|t| (t.node_id.as_str(), t.activation, t.status))
      .collect();
    assert_eq!(
      ends,
      vec![("b", 2, TraceStatus::Success), ("a", 1, TraceStatus::Error)]
    );
  }

  #[test]
  fn test_end_back_fills_start() {
    let recorder = recorder();
    let open = recorder.start(&agent("a"), json!("in")).unwrap();
    assert!(recorder.snapshot().traces[0].duration_ms.is_none());

    let end = recorder.succeed(&open, json!("out"), None).unwrap();

    let start = &recorder.snapshot().traces[0];
    assert_eq!(start.phase, TracePhase::Start);
    assert_eq!(start.status, TraceStatus::Running);
    assert_eq!(start.ended_at, end.ended_at);
    assert_eq!(start.duration_ms, end.duration_ms);
    assert_eq!(end.input, json!("in"));
    assert_eq!(end.output, Some(json!("out")));
  }

  #[test]
  fn test_reentrant_activations_of_one_node() {
    let recorder = recorder();
    let first = recorder.start(&agent("join"), json!("left")).unwrap();
    let second = recorder.start(&agent("join"), json!("right")).unwrap();
    assert_eq!(recorder.open_activations("join"), 2);

    let end = recorder.succeed(&second, json!("r"), None).unwrap();
    assert_eq!(end.activation, second.sequence);
    assert_eq!(end.input, json!("right"));
    assert_eq!(recorder.open_activations("join"), 1);

    let end = recorder.succeed(&first, json!("l"), None).unwrap();
    assert_eq!(end.activation, first.sequence);
    assert_eq!(recorder.open_activations("join"), 0);
  }

  #[test]
  fn test_activation_ends_once() {
    let recorder = recorder();
    let open = recorder.start(&agent("a"), json!(null)).unwrap();
    assert!(recorder.succeed(&open, json!(1), None).is_some());
    assert!(recorder.succeed(&open, json!(2), None).is_none());
    assert_eq!(recorder.snapshot().traces.len(), 2);
  }

  #[test]
  fn test_sealed_after_finish() {
    let recorder = recorder();
    assert!(recorder.mark_running());
    let open = recorder.start(&agent("a"), json!(null)).unwrap();

    assert!(recorder.finish(RunStatus::Cancelled, None, None));
    assert!(!recorder.finish(RunStatus::Completed, None, None));
    assert!(recorder.is_sealed());

    assert!(recorder.succeed(&open, json!(1), None).is_none());
    assert!(recorder.start(&agent("b"), json!(null)).is_none());

    let run = recorder.snapshot();
    assert_eq!(run.status, RunStatus::Cancelled);
    assert_eq!(run.traces.len(), 1);
    assert!(run.ended_at.is_some());
  }
}
