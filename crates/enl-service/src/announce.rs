//! Inbound announcement processing
//!
//! Announced properties are handed to the proxy registered for the
//! announcing object, if any. Confirmed announcements (INFC) are also
//! acknowledged with an INFC_Res per local destination object.

use std::sync::Arc;

use tracing::{trace, warn};

use enl_core::{Esv, Frame, FrameBuilder, Property, Receiver, Transport};
use enl_object::{LocalRegistry, ObjectData};
use enl_remote::RemoteRegistry;

use crate::RequestProcessor;

/// Serves INF and INFC
pub struct AnnounceProcessor {
    registry: Arc<LocalRegistry>,
    remotes: Arc<RemoteRegistry>,
    transport: Arc<dyn Transport>,
}

impl AnnounceProcessor {
    pub fn new(
        registry: Arc<LocalRegistry>,
        remotes: Arc<RemoteRegistry>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        AnnounceProcessor {
            registry,
            remotes,
            transport,
        }
    }

    fn forward(&self, frame: &Frame) -> bool {
        let Some(remote) = self.remotes.get(frame.sender, frame.seoj) else {
            trace!(sender = %frame.sender, seoj = %frame.seoj, "announcement from unknown object");
            return false;
        };

        for property in &frame.first {
            remote.notify_data(property.epc, ObjectData::new(property.edt.clone()));
        }
        true
    }

    fn confirm(&self, frame: &Frame) -> bool {
        let objects = self.registry.resolve(frame.deoj);
        if objects.is_empty() {
            return false;
        }

        let echoed: Vec<_> = frame.first.iter().map(|p| Property::request(p.epc)).collect();
        for object in objects {
            let reply = FrameBuilder::new(
                self.transport.local_node(),
                Receiver::Node(frame.sender),
                Esv::InfCRes,
            )
            .tid(frame.tid)
            .seoj(object.eoj())
            .deoj(frame.seoj)
            .first(echoed.clone())
            .build();

            if let Err(e) = self.transport.send(reply) {
                warn!(eoj = %object.eoj(), error = %e, "confirmation not sent");
            }
        }
        true
    }
}

impl RequestProcessor for AnnounceProcessor {
    fn process(&self, frame: &Frame) -> bool {
        if !frame.esv.is_announcement() {
            return false;
        }

        let forwarded = self.forward(frame);
        let confirmed = frame.esv == Esv::InfC && self.confirm(frame);
        forwarded || confirmed
    }
}
