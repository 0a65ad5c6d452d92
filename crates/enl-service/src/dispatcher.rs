//! Frame dispatch
//!
//! Every inbound frame is offered to every registered processor. A frame
//! no processor claims is logged and dropped.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use enl_core::Frame;

/// Handles one family of inbound frames
pub trait RequestProcessor: Send + Sync {
    /// Process a frame, returning whether it was handled
    fn process(&self, frame: &Frame) -> bool;
}

/// Processor handle
pub type ProcessorRef = Arc<dyn RequestProcessor>;

/// Offers inbound frames to each processor in turn
#[derive(Default)]
pub struct RequestDispatcher {
    processors: RwLock<Vec<ProcessorRef>>,
}

impl RequestDispatcher {
    pub fn new() -> Self {
        RequestDispatcher::default()
    }

    pub fn add_processor(&self, processor: ProcessorRef) {
        self.processors.write().push(processor);
    }

    pub fn processor_count(&self) -> usize {
        self.processors.read().len()
    }

    /// Offer a frame to every processor; true if any handled it
    pub fn dispatch(&self, frame: &Frame) -> bool {
        let processors = self.processors.read().clone();

        let mut handled = false;
        for processor in processors {
            handled |= processor.process(frame);
        }

        if !handled {
            trace!(sender = %frame.sender, esv = ?frame.esv, deoj = %frame.deoj, "frame unhandled");
        }
        handled
    }
}

impl std::fmt::Debug for RequestDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDispatcher")
            .field("processors", &self.processor_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enl_core::{Eoj, Esv, NodeId, Receiver};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        claims: bool,
        seen: AtomicUsize,
    }

    impl RequestProcessor for Counting {
        fn process(&self, _frame: &Frame) -> bool {
            self.seen.fetch_add(1, Ordering::SeqCst);
            self.claims
        }
    }

    fn frame() -> Frame {
        Frame::new(NodeId::new(2), Receiver::Group, Eoj::NODE_PROFILE, Eoj::NODE_PROFILE, Esv::Get)
    }

    #[test]
    fn test_every_processor_sees_frame() {
        let dispatcher = RequestDispatcher::new();
        let first = Arc::new(Counting { claims: true, seen: AtomicUsize::new(0) });
        let second = Arc::new(Counting { claims: false, seen: AtomicUsize::new(0) });
        dispatcher.add_processor(first.clone());
        dispatcher.add_processor(second.clone());

        assert!(dispatcher.dispatch(&frame()));
        assert_eq!(first.seen.load(Ordering::SeqCst), 1);
        assert_eq!(second.seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unclaimed_frame_is_unhandled() {
        let dispatcher = RequestDispatcher::new();
        assert!(!dispatcher.dispatch(&frame()));

        dispatcher.add_processor(Arc::new(Counting { claims: false, seen: AtomicUsize::new(0) }));
        assert!(!dispatcher.dispatch(&frame()));
        assert_eq!(dispatcher.processor_count(), 1);
    }
}
