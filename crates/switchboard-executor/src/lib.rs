//! Switchboard Executor
//!
//! Node executors turn `(node, input)` into an [`ExecutionOutcome`]. There is
//! one executor per node kind and [`NodeExecutors`] dispatches over the closed
//! set of kinds.
//!
//! Work that reaches outside the engine (a reasoning service for agents, a tool
//! service for tools, the gate deciding a handoff condition) sits behind the
//! [`ReasoningClient`], [`ToolClient`] and [`HandoffGate`] traits. The engine
//! ships a simulated implementation of each and a scripted one for tests.

mod arguments;
mod client;
mod executor;
mod outcome;
pub mod scripted;
pub mod simulated;

pub use arguments::{ArgumentError, resolve_arguments};
pub use client::{HandoffGate, ReasoningClient, ToolClient};
pub use executor::{AgentExecutor, HandoffExecutor, NodeExecutors, ToolExecutor, TriggerExecutor};
pub use outcome::{ActivationInput, ExecutionOutcome};
