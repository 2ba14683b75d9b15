//! Workflow runtime.
//!
//! The [`Runtime`] owns the node executors and the process-wide defaults.
//! [`Runtime::start`] spawns a run and returns a [`RunHandle`];
//! [`Runtime::run`] validates a definition and awaits the run to completion.

use std::any::Any;
use std::collections::{BTreeMap, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::{FutureExt, StreamExt};
use futures::stream::BoxStream;
use switchboard_config::{FailurePolicy, NodeDef, NodeType, WorkflowDef};
use switchboard_executor::{ActivationInput, ExecutionOutcome, NodeExecutors};
use switchboard_workflow::Graph;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, instrument, warn};

use crate::config::{RunLimits, RuntimeConfig};
use crate::error::RuntimeError;
use crate::recorder::TraceRecorder;
use crate::run::{ExecutionRun, RunStatus};
use crate::stream::{RunEvent, subscribe};

/// Runs workflow graphs against inputs.
#[derive(Clone)]
pub struct Runtime {
  executors: Arc<NodeExecutors>,
  config: RuntimeConfig,
}

impl Runtime {
  pub fn new(executors: NodeExecutors, config: RuntimeConfig) -> Self {
    Self {
      executors: Arc::new(executors),
      config,
    }
  }

  /// A runtime backed by the in-process simulated clients.
  pub fn simulated(config: RuntimeConfig) -> Self {
    Self::new(NodeExecutors::simulated(), config)
  }

  pub fn config(&self) -> &RuntimeConfig {
    &self.config
  }

  /// Validate `def`, run it against `input` and wait for the terminal state.
  ///
  /// An invalid definition yields a `Failed` run with no traces.
  pub async fn run(&self, def: WorkflowDef, input: serde_json::Value) -> ExecutionRun {
    let workflow_id = def.workflow_id.clone();
    match Graph::new(def) {
      Ok(graph) => self.start(graph, input).wait().await,
      Err(e) => {
        let error = RuntimeError::InvalidGraph {
          message: e.validation().to_string(),
        };
        let run = ExecutionRun::rejected(workflow_id, input, error.to_string());
        error!(run_id = %run.id, workflow_id = %run.workflow_id, error = %error, "workflow_failed");
        run
      }
    }
  }

  /// Spawn a run of `graph`. Must be called within a tokio runtime.
  pub fn start(&self, graph: Graph, input: serde_json::Value) -> RunHandle {
    let limits = self.config.limits_for(graph.settings());
    let run = ExecutionRun::new(graph.workflow_id(), input.clone());
    let recorder = Arc::new(TraceRecorder::new(run));
    recorder.mark_running();

    let handle = RunHandle {
      recorder: recorder.clone(),
      cancel: CancellationToken::new(),
    };

    let scheduler = Scheduler {
      run_id: recorder.run_id(),
      graph: Arc::new(graph),
      executors: self.executors.clone(),
      recorder,
      cancel: handle.cancel.clone(),
      limits,
    };
    tokio::spawn(scheduler.drive(input));

    handle
  }
}

/// Handle to a spawned run. Cheap to clone.
#[derive(Clone)]
pub struct RunHandle {
  recorder: Arc<TraceRecorder>,
  cancel: CancellationToken,
}

impl RunHandle {
  pub fn id(&self) -> String {
    self.recorder.run_id()
  }

  pub fn status(&self) -> RunStatus {
    self.recorder.status()
  }

  /// The run as recorded so far.
  pub fn snapshot(&self) -> ExecutionRun {
    self.recorder.snapshot()
  }

  /// Stream of traces from the start of the run, then one terminal event.
  pub fn subscribe(&self) -> BoxStream<'static, RunEvent> {
    subscribe(self.recorder.clone()).boxed()
  }

  /// Request cancellation.
  ///
  /// The run becomes `Cancelled` immediately and records nothing further.
  /// Invocations already in flight finish in the background; their results
  /// are discarded. Returns false if the run had already ended.
  pub fn cancel(&self) -> bool {
    let cancelled = self.recorder.finish(RunStatus::Cancelled, None, None);
    self.cancel.cancel();
    if cancelled {
      info!(run_id = %self.recorder.run_id(), "workflow_cancelled");
    }
    cancelled
  }

  /// Wait for the terminal state and return the final run.
  pub async fn wait(&self) -> ExecutionRun {
    let mut changed = self.recorder.watch();
    loop {
      changed.borrow_and_update();
      let run = self.recorder.snapshot();
      if run.is_terminal() || changed.changed().await.is_err() {
        return run;
      }
    }
  }
}

/// One pending activation: a node and what its inbound edge carries.
struct Activation {
  node_id: String,
  payload: serde_json::Value,
  context: Option<Arc<serde_json::Value>>,
}

/// How an activation task ended.
enum Report {
  Succeeded {
    node: NodeDef,
    output: serde_json::Value,
    context: Option<Arc<serde_json::Value>>,
  },
  Failed {
    node_id: String,
  },
  /// Cancelled or sealed before anything was recorded.
  Discarded,
}

/// How branches ended, for the run's terminal status.
#[derive(Default)]
struct Tally {
  succeeded_leaves: usize,
  failed_nodes: Vec<String>,
  /// Leaf node ID -> latest successful output.
  outputs: BTreeMap<String, serde_json::Value>,
}

struct Scheduler {
  run_id: String,
  graph: Arc<Graph>,
  executors: Arc<NodeExecutors>,
  recorder: Arc<TraceRecorder>,
  cancel: CancellationToken,
  limits: RunLimits,
}

impl Scheduler {
  #[instrument(
    name = "workflow_run",
    skip(self, input),
    fields(run_id = %self.run_id, workflow_id = %self.graph.workflow_id())
  )]
  async fn drive(self, input: serde_json::Value) {
    info!(
      run_id = %self.run_id,
      workflow_id = %self.graph.workflow_id(),
      step_budget = self.limits.step_budget,
      "workflow_started"
    );

    let context = Some(Arc::new(input.clone()));
    let mut pending: VecDeque<Activation> = self
      .graph
      .entry_points()
      .map(|node| Activation {
        node_id: node.node_id.clone(),
        payload: input.clone(),
        context: context.clone(),
      })
      .collect();

    let mut in_flight: JoinSet<Report> = JoinSet::new();
    let mut activations = 0usize;
    let mut budget_exceeded = false;
    let mut tally = Tally::default();

    loop {
      while let Some(activation) = pending.pop_front() {
        if activations >= self.limits.step_budget {
          warn!(
            run_id = %self.run_id,
            budget = self.limits.step_budget,
            "step budget exhausted, not starting further activations"
          );
          budget_exceeded = true;
          pending.clear();
          break;
        }
        activations += 1;

        let span = info_span!("activation", node_id = %activation.node_id);
        in_flight.spawn(self.clone_for_task().activate(activation).instrument(span));
      }

      if in_flight.is_empty() {
        break;
      }

      tokio::select! {
        biased;
        _ = self.cancel.cancelled() => {
          // In-flight invocations finish on their own; the sealed recorder
          // drops whatever they try to record.
          in_flight.detach_all();
          self.recorder.finish(RunStatus::Cancelled, None, None);
          return;
        }
        joined = in_flight.join_next() => {
          match joined {
            Some(Ok(report)) => self.absorb(report, &mut pending, &mut tally),
            Some(Err(e)) => error!(run_id = %self.run_id, error = %e, "activation task aborted"),
            None => break,
          }
        }
      }
    }

    self.conclude(budget_exceeded, tally);
  }

  fn clone_for_task(&self) -> TaskContext {
    TaskContext {
      run_id: self.run_id.clone(),
      graph: self.graph.clone(),
      executors: self.executors.clone(),
      recorder: self.recorder.clone(),
      cancel: self.cancel.clone(),
      limits: self.limits,
    }
  }

  /// Fold a finished activation into the run and queue its successors.
  fn absorb(&self, report: Report, pending: &mut VecDeque<Activation>, tally: &mut Tally) {
    match report {
      Report::Succeeded {
        node,
        output,
        context,
      } => {
        // A handoff that drops context also drops it for everything after it.
        let context = match &node.node_type {
          NodeType::Handoff(handoff) if !handoff.preserve_context => None,
          _ => context,
        };

        if self.graph.is_leaf(&node.node_id) {
          tally.succeeded_leaves += 1;
          tally.outputs.insert(node.node_id.clone(), output);
          return;
        }

        for edge in self.graph.outgoing(&node.node_id) {
          pending.push_back(Activation {
            node_id: edge.target.clone(),
            payload: output.clone(),
            context: context.clone(),
          });
        }
      }
      Report::Failed { node_id } => tally.failed_nodes.push(node_id),
      Report::Discarded => {}
    }
  }

  /// Decide the terminal status once nothing is left to run.
  fn conclude(&self, budget_exceeded: bool, tally: Tally) {
    let output = Some(serde_json::Value::Object(tally.outputs.into_iter().collect()));

    let (status, error) = if budget_exceeded {
      let error = RuntimeError::StepBudgetExceeded {
        budget: self.limits.step_budget,
      };
      (RunStatus::Failed, Some(error.to_string()))
    } else if self.limits.failure_policy == FailurePolicy::FailWhenAllBranchesFail
      && tally.succeeded_leaves == 0
      && !tally.failed_nodes.is_empty()
    {
      let error = format!("all branches failed: {}", tally.failed_nodes.join(", "));
      (RunStatus::Failed, Some(error))
    } else {
      (RunStatus::Completed, None)
    };

    if !self.recorder.finish(status, output, error.clone()) {
      return;
    }

    match status {
      RunStatus::Completed => {
        info!(
          run_id = %self.run_id,
          failed_branches = tally.failed_nodes.len(),
          "workflow_completed"
        );
      }
      _ => {
        error!(
          run_id = %self.run_id,
          error = error.as_deref().unwrap_or_default(),
          "workflow_failed"
        );
      }
    }
  }
}

/// What an activation task needs, owned so the task is `'static`.
struct TaskContext {
  run_id: String,
  graph: Arc<Graph>,
  executors: Arc<NodeExecutors>,
  recorder: Arc<TraceRecorder>,
  cancel: CancellationToken,
  limits: RunLimits,
}

impl TaskContext {
  async fn activate(self, activation: Activation) -> Report {
    if self.cancel.is_cancelled() {
      return Report::Discarded;
    }

    let Some(node) = self.graph.node(&activation.node_id).cloned() else {
      return Report::Discarded;
    };

    let Some(open) = self.recorder.start(&node, activation.payload.clone()) else {
      return Report::Discarded;
    };

    info!(
      run_id = %self.run_id,
      node_id = %node.node_id,
      node_kind = %node.kind(),
      sequence = open.sequence,
      join_point = self.graph.is_join_point(&node.node_id),
      "node_started"
    );

    let mut input = ActivationInput::new(activation.payload, activation.context.clone());
    let (outcome, attempts) = self.invoke(&node, &mut input).await;

    match outcome {
      ExecutionOutcome::Success { output, metadata } => {
        let metadata = with_attempts(metadata, attempts);
        if self
          .recorder
          .succeed(&open, output.clone(), Some(metadata))
          .is_none()
        {
          return Report::Discarded;
        }
        info!(
          run_id = %self.run_id,
          node_id = %node.node_id,
          attempts,
          "node_completed"
        );
        Report::Succeeded {
          node,
          output,
          context: activation.context,
        }
      }
      ExecutionOutcome::Failure { reason, .. } => {
        let metadata = with_attempts(None, attempts);
        if self.recorder.fail(&open, &reason, Some(metadata)).is_none() {
          return Report::Discarded;
        }
        warn!(
          run_id = %self.run_id,
          node_id = %node.node_id,
          attempts,
          error = %reason,
          "node_failed"
        );
        Report::Failed {
          node_id: node.node_id,
        }
      }
    }
  }

  /// Invoke the node's executor, retrying retryable failures.
  async fn invoke(&self, node: &NodeDef, input: &mut ActivationInput) -> (ExecutionOutcome, u32) {
    let max_attempts = self.limits.max_retries.saturating_add(1);
    let mut attempt = 1;

    loop {
      input.attempt = attempt;
      let call = AssertUnwindSafe(self.executors.execute(node, input)).catch_unwind();
      let result = match self.limits.node_timeout_ms {
        Some(ms) => match tokio::time::timeout(Duration::from_millis(ms), call).await {
          Ok(result) => result,
          Err(_) => Ok(ExecutionOutcome::retryable(format!("timed out after {} ms", ms))),
        },
        None => call.await,
      };
      let outcome = result.unwrap_or_else(|panic| {
        let error = RuntimeError::Panicked {
          node_id: node.node_id.clone(),
          message: panic_message(panic.as_ref()),
        };
        error!(run_id = %self.run_id, error = %error, "executor panicked");
        ExecutionOutcome::failure(error.to_string())
      });

      if !outcome.is_retryable() || attempt >= max_attempts || self.cancel.is_cancelled() {
        return (outcome, attempt);
      }

      warn!(
        run_id = %self.run_id,
        node_id = %node.node_id,
        attempt,
        "retrying node after retryable failure"
      );
      if self.limits.retry_delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(self.limits.retry_delay_ms)).await;
      }
      attempt += 1;
    }
  }
}

fn with_attempts(metadata: Option<serde_json::Value>, attempts: u32) -> serde_json::Value {
  let mut map = match metadata {
    Some(serde_json::Value::Object(map)) => map,
    Some(other) => serde_json::Map::from_iter([("detail".to_string(), other)]),
    None => serde_json::Map::new(),
  };
  map.insert("attempts".to_string(), attempts.into());
  serde_json::Value::Object(map)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
  if let Some(message) = panic.downcast_ref::<&str>() {
    message.to_string()
  } else if let Some(message) = panic.downcast_ref::<String>() {
    message.clone()
  } else {
    "activation panicked".to_string()
  }
}
