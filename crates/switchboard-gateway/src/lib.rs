//! Switchboard Gateway
//!
//! The outward surface of the engine. [`RunRegistry`] keeps the runs of this
//! process addressable by ID (submit, subscribe, cancel, inspect) and
//! [`GatewayServer`] exposes it over HTTP, streaming run events as
//! server-sent events.

mod config;
mod error;
mod registry;
mod server;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use registry::{RunRegistry, RunSummary};
pub use server::GatewayServer;
