//! Runtime error types.

/// Run-level errors. Node failures are not errors; they are recorded on the
/// trace of the failing activation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
  /// The graph failed structural validation.
  #[error("invalid graph: {message}")]
  InvalidGraph { message: String },

  /// The run tried to start more activations than its budget allows.
  #[error("step budget exceeded: limit is {budget} activations")]
  StepBudgetExceeded { budget: usize },

  /// No run with this ID is known.
  #[error("unknown run '{run_id}'")]
  UnknownRun { run_id: String },

  /// A node executor panicked mid-invocation. Recorded as the activation's
  /// failure, never retried.
  #[error("activation panicked: {message}")]
  Panicked { node_id: String, message: String },
}
