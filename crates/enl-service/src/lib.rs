//! ENL Service - Inbound request dispatch
//!
//! This crate turns inbound frames into object operations:
//! - Set / Get / SetGet / observation requests against local objects
//! - Inbound announcements forwarded to remote proxies
//! - Confirmation replies for confirmed announcements
//! - A dispatcher that offers every frame to every processor

pub mod announce;
pub mod dispatcher;
pub mod set_get;

pub use announce::*;
pub use dispatcher::*;
pub use set_get::*;

#[cfg(test)]
mod testing;
