//! ENL Remote - Client-side access to objects hosted by other nodes
//!
//! This crate provides:
//! - The request/response transaction seam
//! - Remote object proxies with blocking, time-bounded accessors
//! - Announcement fan-out to observers
//! - The remote object registry

pub mod object;
pub mod registry;
pub mod transaction;

pub use object::*;
pub use registry::*;
pub use transaction::*;
