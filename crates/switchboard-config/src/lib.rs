//! Switchboard Config
//!
//! This crate contains the serializable graph definition types for switchboard.
//! A definition is plain structured data: nodes, edges and run settings. It is
//! what callers submit, what the HTTP API accepts and returns, and what the CLI
//! reads from disk.
//!
//! The engine takes these definitions, validates them, and builds an immutable
//! graph (see `switchboard-workflow`) before any node runs.

mod edge;
mod enums;
mod node;
mod templates;
mod workflow;

pub use edge::{Edge, INPUT_PORT, OUTPUT_PORT};
pub use enums::{FailurePolicy, NodeKind, ParameterType, RiskLevel, ToolCategory, TriggerType};
pub use node::{AgentConfig, HandoffConfig, NodeDef, NodeType, ToolConfig, ToolParameter, TriggerConfig};
pub use templates::{TEMPLATE_IDS, content_creation, customer_support, template};
pub use workflow::{WorkflowDef, WorkflowSettings, WorkflowSummary};
