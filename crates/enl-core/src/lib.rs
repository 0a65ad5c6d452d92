//! ENL Core - Fundamental types of the object-access layer
//!
//! This crate defines the types shared by every layer:
//! - Identifiers (NodeId, ClassEoj, Eoj, Epc, Tid)
//! - Service codes (Esv) and their reply pairing
//! - Properties and structured frames
//! - Capability bitmaps and instance lists
//! - Static property catalogs (descriptors and constraints)
//! - The transport seam frames leave through

pub mod catalog;
pub mod error;
pub mod esv;
pub mod frame;
pub mod id;
pub mod instance_list;
pub mod property;
pub mod property_map;
pub mod transport;

pub use catalog::*;
pub use error::*;
pub use esv::*;
pub use frame::*;
pub use id::*;
pub use instance_list::*;
pub use property::*;
pub use property_map::*;
pub use transport::*;
