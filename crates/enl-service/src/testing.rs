//! Shared test fixtures

use parking_lot::Mutex;

use enl_core::{ClassEoj, EnlResult, Epc, Frame, NodeId, ObjectInfo, PropertyDescriptor, Transport};

pub const LOCAL: NodeId = NodeId(1);
pub const PEER: NodeId = NodeId(2);

/// Transport that keeps every frame it is handed
pub struct Recorder {
    node: NodeId,
    frames: Mutex<Vec<Frame>>,
}

impl Recorder {
    pub fn new(node: NodeId) -> Self {
        Recorder {
            node,
            frames: Mutex::new(Vec::new()),
        }
    }

    pub fn take(&self) -> Vec<Frame> {
        std::mem::take(&mut *self.frames.lock())
    }
}

impl Transport for Recorder {
    fn local_node(&self) -> NodeId {
        self.node
    }

    fn send(&self, frame: Frame) -> EnlResult<()> {
        self.frames.lock().push(frame);
        Ok(())
    }
}

/// 0x80 read/write/observable, 0xE0 read-only
pub fn device_info(class: ClassEoj) -> ObjectInfo {
    ObjectInfo::builder(class)
        .add(
            PropertyDescriptor::new(Epc(0x80))
                .gettable()
                .settable()
                .observable()
                .default_value(vec![0x31]),
        )
        .add(PropertyDescriptor::new(Epc(0xE0)).gettable().default_value(vec![0x12, 0x34]))
        .build()
}
