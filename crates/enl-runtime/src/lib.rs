//! ENL Runtime - Node orchestration
//!
//! This crate wires the object layer into a running node:
//! - Configuration loading and validation
//! - Tracing initialisation
//! - Node profile bootstrap and local registration
//! - Discovery of remote objects from instance lists
//! - The inbound worker loop (one blocking worker per frame)

pub mod config;
pub mod discovery;
pub mod node;
pub mod telemetry;

pub use config::*;
pub use discovery::*;
pub use node::*;
pub use telemetry::*;
