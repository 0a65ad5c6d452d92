//! ENL Object Engine - Local objects and the object-access protocol
//!
//! This crate implements the local side of the object-access layer:
//! - Stored values with announce history
//! - The delegate chain (intercept, veto, short-circuit, synthesize)
//! - Property engines with permission and constraint enforcement
//! - Collision-free instance-code allocation
//! - The local object registry
//! - Atomic set-then-get batch operations

pub mod allocator;
pub mod batch;
pub mod data;
pub mod delegate;
pub mod delegates;
pub mod object;
pub mod registry;

pub use allocator::*;
pub use batch::*;
pub use data::*;
pub use delegate::*;
pub use delegates::*;
pub use object::*;
pub use registry::*;
