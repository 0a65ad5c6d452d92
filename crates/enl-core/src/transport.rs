//! Outbound frame seam
//!
//! Encoding and delivery are owned by the transport implementation; the
//! object layer only hands it structured frames.

use crate::{EnlResult, Frame, NodeId};

/// Frame sink provided by the transport layer
pub trait Transport: Send + Sync {
    /// Node this transport sends from
    fn local_node(&self) -> NodeId;

    /// Queue a frame for delivery without blocking on the network
    fn send(&self, frame: Frame) -> EnlResult<()>;
}
