//! Multi-node scenarios over one simulated network

use std::sync::Arc;

use enl_core::{
    ClassEoj, EnlResult, Epc, NodeId, ObjectInfo, PropertyDescriptor, SizeConstraint,
    ValueSetConstraint,
};
use enl_object::LocalObject;
use enl_runtime::{Node, NodeConfig};

use crate::{Endpoint, SimulatedNetwork};

/// Lighting class used by the scenarios
pub const LIGHT_CLASS: ClassEoj = ClassEoj::new(0x02, 0x90);

/// Operation status on / off
pub const STATUS: Epc = Epc(0x80);
/// Brightness, one byte
pub const BRIGHTNESS: Epc = Epc(0xB0);
/// Measured power, two bytes, read-only
pub const POWER: Epc = Epc(0xE0);

/// Catalog of the scenario light
pub fn light_info() -> ObjectInfo {
    ObjectInfo::builder(LIGHT_CLASS)
        .add(
            PropertyDescriptor::new(STATUS)
                .gettable()
                .settable()
                .observable()
                .constraint(ValueSetConstraint::new([vec![0x30], vec![0x31]]))
                .default_value(vec![0x31]),
        )
        .add(
            PropertyDescriptor::new(BRIGHTNESS)
                .gettable()
                .settable()
                .constraint(SizeConstraint::exact(1))
                .default_value(vec![0x64]),
        )
        .add(PropertyDescriptor::new(POWER).gettable().default_value(vec![0x00, 0x2A]))
        .build()
}

/// Nodes 1..=n attached to one network
pub struct Cluster {
    network: Arc<SimulatedNetwork>,
    nodes: Vec<Arc<Node>>,
}

impl Cluster {
    pub fn new(count: u64) -> EnlResult<Self> {
        Self::with_config(SimulatedNetwork::new(), count, NodeConfig::default())
    }

    /// Build `count` nodes; each gets `config` with its own node id
    pub fn with_config(
        network: Arc<SimulatedNetwork>,
        count: u64,
        config: NodeConfig,
    ) -> EnlResult<Self> {
        let mut nodes = Vec::new();
        for id in 1..=count {
            let endpoint = network.endpoint(NodeId::new(id));
            let config = NodeConfig {
                node_id: id,
                ..config.clone()
            };
            let node = Arc::new(Node::new(config, endpoint.clone(), endpoint.clone())?);
            endpoint.attach(&node);
            nodes.push(node);
        }
        Ok(Cluster { network, nodes })
    }

    pub fn network(&self) -> &Arc<SimulatedNetwork> {
        &self.network
    }

    /// Node by 1-based id
    pub fn node(&self, id: u64) -> &Arc<Node> {
        &self.nodes[(id - 1) as usize]
    }

    pub fn endpoint(&self, id: u64) -> Arc<Endpoint> {
        self.network.endpoint(NodeId::new(id))
    }

    /// Register `count` lights at a node
    pub fn add_lights(&self, id: u64, count: usize) -> EnlResult<()> {
        for _ in 0..count {
            self.node(id).register(LocalObject::unassigned(light_info()), true)?;
        }
        Ok(())
    }
}
