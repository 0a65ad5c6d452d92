//! Built-in delegates

pub mod announce;
pub mod node_profile;

pub use announce::*;
pub use node_profile::*;
