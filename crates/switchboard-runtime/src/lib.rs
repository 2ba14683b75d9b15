//! Switchboard Runtime
//!
//! This crate runs workflow graphs. The [`Runtime`] walks a validated
//! [`Graph`](switchboard_workflow::Graph) from its triggers, activates
//! downstream nodes concurrently along every outgoing edge, and records a
//! start/end [`Trace`] pair around each activation.
//!
//! Each run owns a [`TraceRecorder`], the only state shared between its
//! branches. Subscribers read the recorder's log as a stream of
//! [`RunEvent`]s that ends with one terminal event.

mod config;
mod error;
mod recorder;
mod run;
mod runtime;
mod stream;
mod trace;

pub use config::{RunLimits, RuntimeConfig};
pub use error::RuntimeError;
pub use recorder::{OpenActivation, TraceRecorder};
pub use run::{ExecutionRun, RunStatus};
pub use runtime::{RunHandle, Runtime};
pub use stream::{RunEvent, encode_line, subscribe};
pub use trace::{Trace, TracePhase, TraceStatus};
