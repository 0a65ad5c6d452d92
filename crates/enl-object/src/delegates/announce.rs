//! Forward committed changes of observable properties as announcements

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use tracing::warn;

use enl_core::{Eoj, Epc, Esv, FrameBuilder, Property, Receiver, Tid, Transport};

use crate::{LocalObject, LocalObjectDelegate, NotifyState};

/// Sends an INF to the group whenever an observable property changes
pub struct AnnounceDelegate {
    transport: Arc<dyn Transport>,
    next_tid: AtomicU16,
}

impl AnnounceDelegate {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        AnnounceDelegate {
            transport,
            next_tid: AtomicU16::new(0),
        }
    }
}

impl LocalObjectDelegate for AnnounceDelegate {
    fn notify_data_changed(&self, state: &mut NotifyState, object: &LocalObject, epc: Epc) {
        if !object.is_observable(epc) {
            return;
        }

        let tid = Tid(self.next_tid.fetch_add(1, Ordering::Relaxed));
        let frame = FrameBuilder::new(self.transport.local_node(), Receiver::Group, Esv::Inf)
            .tid(tid)
            .seoj(object.eoj())
            .deoj(Eoj::NODE_PROFILE)
            .property(Property::new(epc, state.cur_data().data().clone()))
            .build();

        if let Err(e) = self.transport.send(frame) {
            warn!(eoj = %object.eoj(), %epc, error = %e, "announcement not sent");
            state.add_message(e.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enl_core::{ClassEoj, EnlResult, Frame, NodeId, ObjectInfo, PropertyDescriptor};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        frames: Mutex<Vec<Frame>>,
    }

    impl Transport for Recorder {
        fn local_node(&self) -> NodeId {
            NodeId::new(1)
        }

        fn send(&self, frame: Frame) -> EnlResult<()> {
            self.frames.lock().push(frame);
            Ok(())
        }
    }

    fn object() -> LocalObject {
        let info = ObjectInfo::builder(ClassEoj::new(0x01, 0x30))
            .add(PropertyDescriptor::new(Epc(0x80)).gettable().settable().observable().default_value(vec![0x31]))
            .add(PropertyDescriptor::new(Epc(0xB0)).gettable().settable().default_value(vec![0x41]))
            .build();
        LocalObject::new(Eoj::new(0x01, 0x30, 0x01), info)
    }

    #[test]
    fn test_observable_change_is_announced() {
        let recorder = Arc::new(Recorder::default());
        let object = object();
        object.add_delegate(Arc::new(AnnounceDelegate::new(recorder.clone())));

        object.set_data(Epc(0x80), vec![0x30]);
        object.set_data(Epc(0x80), vec![0x30]);
        object.set_data(Epc(0xB0), vec![0x42]);

        let frames = recorder.frames.lock();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].esv, Esv::Inf);
        assert_eq!(frames[0].receiver, Receiver::Group);
        assert_eq!(frames[0].seoj, Eoj::new(0x01, 0x30, 0x01));
        assert_eq!(frames[0].first, vec![Property::new(Epc(0x80), vec![0x30])]);
    }
}
