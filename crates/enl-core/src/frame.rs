//! Structured frame exchanged with the transport layer
//!
//! Binary encoding belongs to the transport; this layer only sees the
//! decoded header fields and the two property lists.

use crate::{Eoj, Esv, NodeId, Property, Tid};

/// Where a frame is delivered
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Receiver {
    /// A single node
    Node(NodeId),
    /// The broadcast / multicast group
    Group,
}

impl Receiver {
    #[inline]
    pub fn is_group(self) -> bool {
        matches!(self, Receiver::Group)
    }

    /// Does a frame addressed here reach `node`?
    #[inline]
    pub fn reaches(self, node: NodeId) -> bool {
        match self {
            Receiver::Node(n) => n == node,
            Receiver::Group => true,
        }
    }
}

/// Decoded frame
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Transaction id
    pub tid: Tid,
    /// Node the frame came from
    pub sender: NodeId,
    /// Node or group the frame goes to
    pub receiver: Receiver,
    /// Source object
    pub seoj: Eoj,
    /// Destination object (instance 0x00 = every instance of the class)
    pub deoj: Eoj,
    /// Service code
    pub esv: Esv,
    /// First property list
    pub first: Vec<Property>,
    /// Second property list (SetGet family only)
    pub second: Vec<Property>,
}

impl Frame {
    /// Create a frame with empty property lists
    pub fn new(sender: NodeId, receiver: Receiver, seoj: Eoj, deoj: Eoj, esv: Esv) -> Self {
        Frame {
            tid: Tid::default(),
            sender,
            receiver,
            seoj,
            deoj,
            esv,
            first: Vec::new(),
            second: Vec::new(),
        }
    }

    /// Number of properties in the first list (OPC)
    #[inline]
    pub fn opc(&self) -> usize {
        self.first.len()
    }

    /// Number of properties in the second list (OPCGet)
    #[inline]
    pub fn opc_get(&self) -> usize {
        self.second.len()
    }

    /// Find the first property with the given code in either list
    pub fn find(&self, epc: crate::Epc) -> Option<&Property> {
        self.first
            .iter()
            .chain(self.second.iter())
            .find(|p| p.epc == epc)
    }
}

/// Frame builder for convenient construction
pub struct FrameBuilder {
    frame: Frame,
}

impl FrameBuilder {
    pub fn new(sender: NodeId, receiver: Receiver, esv: Esv) -> Self {
        FrameBuilder {
            frame: Frame::new(sender, receiver, Eoj::default(), Eoj::default(), esv),
        }
    }

    pub fn tid(mut self, tid: Tid) -> Self {
        self.frame.tid = tid;
        self
    }

    pub fn seoj(mut self, seoj: Eoj) -> Self {
        self.frame.seoj = seoj;
        self
    }

    pub fn deoj(mut self, deoj: Eoj) -> Self {
        self.frame.deoj = deoj;
        self
    }

    pub fn property(mut self, property: Property) -> Self {
        self.frame.first.push(property);
        self
    }

    pub fn first(mut self, properties: Vec<Property>) -> Self {
        self.frame.first = properties;
        self
    }

    pub fn second(mut self, properties: Vec<Property>) -> Self {
        self.frame.second = properties;
        self
    }

    pub fn build(self) -> Frame {
        self.frame
    }
}
