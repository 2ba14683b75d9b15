//! Live subscription to a run's trace log.

use std::sync::Arc;

use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::recorder::{Cursor, TraceRecorder};
use crate::run::RunStatus;
use crate::trace::Trace;

/// An item of a run subscription.
///
/// A subscription yields every trace in sequence order followed by exactly one
/// terminal event: `Complete` for completed or cancelled runs, `Error` for
/// failed ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
  Trace(Trace),
  Complete {
    run_id: String,
    status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    output: Option<serde_json::Value>,
  },
  Error {
    run_id: String,
    status: RunStatus,
    error: String,
  },
}

impl RunEvent {
  pub fn is_terminal(&self) -> bool {
    !matches!(self, RunEvent::Trace(_))
  }

  /// Event name used on the wire.
  pub fn name(&self) -> &'static str {
    match self {
      RunEvent::Trace(_) => "trace",
      RunEvent::Complete { .. } => "complete",
      RunEvent::Error { .. } => "error",
    }
  }
}

/// Encode an event as one line of newline-delimited JSON (without the newline).
pub fn encode_line(event: &RunEvent) -> Result<String, serde_json::Error> {
  serde_json::to_string(event)
}

struct SubscriptionState {
  recorder: Arc<TraceRecorder>,
  changed: tokio::sync::watch::Receiver<u64>,
  next: usize,
  done: bool,
}

/// Subscribe to a run from its first trace.
///
/// Each subscriber has its own position, so late subscribers replay the log
/// before following live appends.
pub fn subscribe(recorder: Arc<TraceRecorder>) -> impl Stream<Item = RunEvent> + Send + 'static {
  let changed = recorder.watch();
  let state = SubscriptionState {
    recorder,
    changed,
    next: 0,
    done: false,
  };

  futures::stream::unfold(state, |mut state| async move {
    if state.done {
      return None;
    }

    loop {
      state.changed.borrow_and_update();
      match state.recorder.cursor(state.next) {
        Cursor::Trace(trace) => {
          state.next += 1;
          return Some((RunEvent::Trace(trace), state));
        }
        Cursor::Finished {
          run_id,
          status,
          output,
          error,
        } => {
          state.done = true;
          let event = match (status, error) {
            (RunStatus::Failed, error) => RunEvent::Error {
              run_id,
              status,
              error: error.unwrap_or_else(|| "run failed".to_string()),
            },
            (status, _) => RunEvent::Complete {
              run_id,
              status,
              output,
            },
          };
          return Some((event, state));
        }
        Cursor::Waiting => {
          if state.changed.changed().await.is_err() {
            return None;
          }
        }
      }
    }
  })
}
