//! Set / Get / SetGet / observation request processing
//!
//! The destination identifier is resolved against the local registry.
//! Each resolved object runs its own batch and produces its own reply, so
//! a class-wildcard request addressed to N objects yields N replies.

use std::sync::Arc;

use tracing::{debug, warn};

use enl_core::{Esv, Frame, FrameBuilder, Receiver, Transport};
use enl_object::{BatchOperation, LocalObject, LocalRegistry};

use crate::RequestProcessor;

/// Serves SetI, SetC, Get, SetGet and INF_REQ against local objects
pub struct SetGetProcessor {
    registry: Arc<LocalRegistry>,
    transport: Arc<dyn Transport>,
}

impl SetGetProcessor {
    pub fn new(registry: Arc<LocalRegistry>, transport: Arc<dyn Transport>) -> Self {
        SetGetProcessor {
            registry,
            transport,
        }
    }

    /// Queue the request's lists into a batch
    fn batch_for(frame: &Frame) -> BatchOperation {
        let mut batch = match frame.esv {
            Esv::InfReq => BatchOperation::announce(),
            _ => BatchOperation::new(),
        };

        match frame.esv {
            Esv::SetI | Esv::SetC => {
                frame.first.iter().cloned().for_each(|p| batch.add_set(p));
            }
            Esv::Get | Esv::InfReq => {
                frame.first.iter().for_each(|p| batch.add_get(p.epc));
            }
            Esv::SetGet => {
                frame.first.iter().cloned().for_each(|p| batch.add_set(p));
                frame.second.iter().for_each(|p| batch.add_get(p.epc));
            }
            _ => {}
        }
        batch
    }

    /// Reply for a finished batch, or `None` when none is due
    fn reply_for(&self, frame: &Frame, object: &LocalObject, batch: &BatchOperation) -> Option<Frame> {
        let success = batch.is_success();
        let esv = if success {
            frame.esv.success_reply()?
        } else {
            frame.esv.failure_reply()?
        };

        // Successful observation requests are answered to the group
        let receiver = if esv == Esv::Inf {
            Receiver::Group
        } else {
            Receiver::Node(frame.sender)
        };

        let builder = FrameBuilder::new(self.transport.local_node(), receiver, esv)
            .tid(frame.tid)
            .seoj(object.eoj())
            .deoj(frame.seoj);

        let builder = match frame.esv {
            Esv::SetI | Esv::SetC => builder.first(batch.set_properties()),
            Esv::SetGet => builder
                .first(batch.set_properties())
                .second(batch.get_properties()),
            _ => builder.first(batch.get_properties()),
        };
        Some(builder.build())
    }
}

impl RequestProcessor for SetGetProcessor {
    fn process(&self, frame: &Frame) -> bool {
        if !frame.esv.is_set_get_request() {
            return false;
        }

        let objects = self.registry.resolve(frame.deoj);
        if objects.is_empty() {
            return false;
        }

        for object in objects {
            let mut batch = Self::batch_for(frame);
            if let Err(e) = batch.run(&object) {
                warn!(eoj = %object.eoj(), error = %e, "batch not run");
                continue;
            }

            debug!(
                eoj = %object.eoj(),
                esv = ?frame.esv,
                success = batch.is_success(),
                "request processed"
            );

            let Some(reply) = self.reply_for(frame, &object, &batch) else {
                continue;
            };
            if let Err(e) = self.transport.send(reply) {
                warn!(eoj = %object.eoj(), error = %e, "reply not sent");
            }
        }
        true
    }
}
