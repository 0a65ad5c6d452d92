//! Node profile instance-list synthesis

use std::sync::Weak;

use enl_core::{
    encode_instance_list, ClassEoj, Epc, ObjectInfo, PropertyDescriptor, SizeConstraint,
};

use crate::{GetState, LocalObject, LocalObjectDelegate, LocalRegistry, ObjectData};

/// Descriptor table of the local node profile object
pub fn node_profile_info() -> ObjectInfo {
    ObjectInfo::builder(ClassEoj::NODE_PROFILE)
        .add(PropertyDescriptor::new(Epc(0x80)).gettable().observable().default_value(vec![0x30]))
        .add(
            PropertyDescriptor::new(Epc(0x82))
                .gettable()
                .default_value(vec![0x01, 0x0D, 0x01, 0x00]),
        )
        .add(
            PropertyDescriptor::new(Epc::SELF_NODE_INSTANCE_COUNT)
                .gettable()
                .default_value(vec![0x00, 0x00, 0x00]),
        )
        .add(
            PropertyDescriptor::new(Epc::INSTANCE_LIST_NOTIFICATION)
                .observable()
                .constraint(SizeConstraint::new(1, 253))
                .default_value(vec![0x00]),
        )
        .add(
            PropertyDescriptor::new(Epc::SELF_NODE_INSTANCE_LIST)
                .gettable()
                .default_value(vec![0x00]),
        )
        .build()
}

/// Answers instance-list reads from the registry's current contents
pub struct NodeProfileDelegate {
    registry: Weak<LocalRegistry>,
}

impl NodeProfileDelegate {
    pub fn new(registry: Weak<LocalRegistry>) -> Self {
        NodeProfileDelegate { registry }
    }
}

impl LocalObjectDelegate for NodeProfileDelegate {
    fn get_data(&self, state: &mut GetState, _object: &LocalObject, epc: Epc) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };

        let eojs: Vec<_> = registry
            .get_device_objects()
            .iter()
            .map(|o| o.eoj())
            .collect();

        match epc {
            Epc::SELF_NODE_INSTANCE_COUNT => {
                let count = (eojs.len() as u32).to_be_bytes();
                state.set_data(ObjectData::new(count[1..].to_vec()));
            }
            Epc::INSTANCE_LIST_NOTIFICATION | Epc::SELF_NODE_INSTANCE_LIST => {
                state.set_data(ObjectData::new(encode_instance_list(&eojs)));
            }
            _ => {}
        }
    }
}
