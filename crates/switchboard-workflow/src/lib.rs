//! Switchboard Workflow
//!
//! This crate provides the validated graph representation for switchboard.
//! A [`Graph`] is built once per run from a [`WorkflowDef`] and never changes
//! afterwards; the runtime only reads from it.
//!
//! Key differences from `switchboard-config`:
//! - Structure is validated (edges resolve, ports exist, no self or duplicate edges)
//! - Entry points are identified (triggers with no incoming edge)
//! - Fan-out order is fixed to edge declaration order
//!
//! [`WorkflowDef`]: switchboard_config::WorkflowDef

mod error;
mod graph;
mod ports;
mod validate;

pub use error::{GraphError, GraphWarning, WorkflowError};
pub use graph::Graph;
pub use ports::{input_ports, output_ports};
pub use validate::{ValidationResult, validate};
