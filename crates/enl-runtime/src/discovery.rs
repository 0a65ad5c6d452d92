//! Remote object discovery
//!
//! Node profiles publish their device objects as instance lists: 0xD5 in
//! announcements and 0xD6 in replies to reads. Every listed object, plus
//! the announcing node profile, gets a proxy in the remote registry.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use enl_core::{decode_instance_list, ClassEoj, EnlResult, Eoj, Epc, Esv, Frame, NodeId};
use enl_remote::{RemoteObject, RemoteObjectRef, RemoteRegistry, TransactionManager};
use enl_service::RequestProcessor;

/// Builds proxies with a shared timeout
#[derive(Clone)]
pub struct ProxyFactory {
    transactions: Arc<dyn TransactionManager>,
    timeout: Duration,
}

impl ProxyFactory {
    pub fn new(transactions: Arc<dyn TransactionManager>, timeout: Duration) -> Self {
        ProxyFactory {
            transactions,
            timeout,
        }
    }

    pub fn create(&self, node: NodeId, eoj: Eoj) -> EnlResult<RemoteObjectRef> {
        let object = RemoteObject::new(node, eoj, self.transactions.clone());
        object.set_timeout(self.timeout)?;
        Ok(Arc::new(object))
    }
}

/// Instance list carried by a frame, if it is one discovery reads
fn instance_list(frame: &Frame) -> Option<&[u8]> {
    if frame.seoj.class_eoj() != ClassEoj::NODE_PROFILE {
        return None;
    }

    let epc = match frame.esv {
        Esv::Inf | Esv::InfC => Epc::INSTANCE_LIST_NOTIFICATION,
        Esv::GetRes => Epc::SELF_NODE_INSTANCE_LIST,
        _ => return None,
    };
    frame.first.iter().find(|p| p.epc == epc).map(|p| p.edt.as_ref())
}

/// Populates the remote registry from instance lists
pub struct DiscoveryProcessor {
    remotes: Arc<RemoteRegistry>,
    factory: ProxyFactory,
    local: NodeId,
}

impl DiscoveryProcessor {
    pub fn new(remotes: Arc<RemoteRegistry>, factory: ProxyFactory, local: NodeId) -> Self {
        DiscoveryProcessor {
            remotes,
            factory,
            local,
        }
    }

    /// Add a proxy unless one is already known, keeping its observers
    fn learn(&self, node: NodeId, eoj: Eoj) -> EnlResult<bool> {
        let (_, created) = self
            .remotes
            .get_or_insert_with(node, eoj, || self.factory.create(node, eoj))?;
        Ok(created)
    }
}

impl RequestProcessor for DiscoveryProcessor {
    fn process(&self, frame: &Frame) -> bool {
        if frame.sender == self.local {
            return false;
        }
        let Some(list) = instance_list(frame) else {
            return false;
        };

        let eojs = match decode_instance_list(list) {
            Ok(eojs) => eojs,
            Err(e) => {
                warn!(sender = %frame.sender, error = %e, "malformed instance list");
                return false;
            }
        };

        let mut learned = 0;
        for eoj in std::iter::once(frame.seoj).chain(eojs) {
            match self.learn(frame.sender, eoj) {
                Ok(true) => learned += 1,
                Ok(false) => {}
                Err(e) => warn!(sender = %frame.sender, %eoj, error = %e, "proxy not created"),
            }
        }

        debug!(sender = %frame.sender, learned, "instance list processed");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enl_core::{encode_instance_list, EnlError, FrameBuilder, Property, Receiver};
    use enl_remote::{Transaction, TransactionConfig};

    struct Offline;

    impl TransactionManager for Offline {
        fn local_node(&self) -> NodeId {
            NodeId::new(1)
        }

        fn create(&self, _config: TransactionConfig) -> EnlResult<Box<dyn Transaction>> {
            Err(EnlError::Transport("offline".into()))
        }
    }

    const PEER: NodeId = NodeId(2);
    const LIGHT: Eoj = Eoj::new(0x02, 0x90, 0x01);
    const SENSOR: Eoj = Eoj::new(0x00, 0x11, 0x01);

    fn processor() -> (Arc<RemoteRegistry>, DiscoveryProcessor) {
        let remotes = Arc::new(RemoteRegistry::new());
        let factory = ProxyFactory::new(Arc::new(Offline), Duration::from_millis(300));
        let processor = DiscoveryProcessor::new(remotes.clone(), factory, NodeId::new(1));
        (remotes, processor)
    }

    fn frame(esv: Esv, epc: Epc, list: Vec<u8>) -> Frame {
        FrameBuilder::new(PEER, Receiver::Group, esv)
            .seoj(Eoj::NODE_PROFILE)
            .deoj(Eoj::NODE_PROFILE)
            .property(Property::new(epc, list))
            .build()
    }

    #[test]
    fn test_announcement_populates_registry() {
        let (remotes, processor) = processor();
        let list = encode_instance_list(&[LIGHT, SENSOR]);
        assert!(processor.process(&frame(Esv::Inf, Epc::INSTANCE_LIST_NOTIFICATION, list)));

        assert_eq!(remotes.get_at_node(PEER).len(), 3);
        let light = remotes.get(PEER, LIGHT).unwrap();
        assert_eq!(light.timeout(), Duration::from_millis(300));
        assert!(remotes.get(PEER, Eoj::NODE_PROFILE).is_some());
    }

    #[test]
    fn test_read_reply_populates_registry() {
        let (remotes, processor) = processor();
        let list = encode_instance_list(&[LIGHT]);
        assert!(processor.process(&frame(Esv::GetRes, Epc::SELF_NODE_INSTANCE_LIST, list)));
        assert!(remotes.get(PEER, LIGHT).is_some());
    }

    #[test]
    fn test_known_proxies_are_kept() {
        let (remotes, processor) = processor();
        let list = encode_instance_list(&[LIGHT]);
        processor.process(&frame(Esv::Inf, Epc::INSTANCE_LIST_NOTIFICATION, list.clone()));
        let first = remotes.get(PEER, LIGHT).unwrap();

        processor.process(&frame(Esv::Inf, Epc::INSTANCE_LIST_NOTIFICATION, list));
        assert!(Arc::ptr_eq(&first, &remotes.get(PEER, LIGHT).unwrap()));
    }

    #[test]
    fn test_ignores_other_frames() {
        let (remotes, processor) = processor();
        let list = encode_instance_list(&[LIGHT]);

        // wrong code for the service
        assert!(!processor.process(&frame(Esv::Inf, Epc::SELF_NODE_INSTANCE_LIST, list.clone())));
        // not a node profile
        let mut device = frame(Esv::Inf, Epc::INSTANCE_LIST_NOTIFICATION, list.clone());
        device.seoj = LIGHT;
        assert!(!processor.process(&device));
        // malformed
        assert!(!processor.process(&frame(Esv::Inf, Epc::INSTANCE_LIST_NOTIFICATION, vec![0x02, 0x02])));
        // our own announcement
        let mut own = frame(Esv::Inf, Epc::INSTANCE_LIST_NOTIFICATION, list);
        own.sender = NodeId::new(1);
        assert!(!processor.process(&own));

        assert!(remotes.is_empty());
    }
}
