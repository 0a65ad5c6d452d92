//! ENL Node - local objects, remote proxies and the inbound loop

use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use enl_core::{
    EnlError, EnlResult, Eoj, Epc, Esv, Frame, FrameBuilder, NodeId, Property, Receiver, Tid,
    Transport,
};
use enl_object::{
    node_profile_info, AnnounceDelegate, LocalObject, LocalObjectRef, LocalRegistry,
    NodeProfileDelegate,
};
use enl_remote::{RemoteObjectRef, RemoteRegistry, TransactionManager};
use enl_service::{AnnounceProcessor, RequestDispatcher, SetGetProcessor};

use crate::{DiscoveryProcessor, NodeConfig, ProxyFactory};

/// Inbound frame counters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeStats {
    pub frames_in: u64,
    pub frames_handled: u64,
    /// Frames addressed to another node
    pub frames_ignored: u64,
}

#[derive(Default)]
struct Counters {
    frames_in: AtomicU64,
    frames_handled: AtomicU64,
    frames_ignored: AtomicU64,
}

/// ENL Node - owns the registries and serves inbound frames
pub struct Node {
    config: NodeConfig,
    transport: Arc<dyn Transport>,
    registry: Arc<LocalRegistry>,
    remotes: Arc<RemoteRegistry>,
    dispatcher: RequestDispatcher,
    proxies: ProxyFactory,
    profile: LocalObjectRef,
    next_tid: AtomicU16,
    counters: Counters,
}

impl Node {
    /// Create a node and register its node profile object
    pub fn new(
        config: NodeConfig,
        transport: Arc<dyn Transport>,
        transactions: Arc<dyn TransactionManager>,
    ) -> EnlResult<Self> {
        config.validate()?;
        let local = transport.local_node();

        let registry = Arc::new(LocalRegistry::new());
        let remotes = Arc::new(RemoteRegistry::new());
        let proxies = ProxyFactory::new(transactions, config.remote_timeout());

        let profile = LocalObject::with_config(
            Eoj::NODE_PROFILE,
            node_profile_info(),
            config.object_config(),
        );
        profile.add_delegate(Arc::new(NodeProfileDelegate::new(Arc::downgrade(&registry))));
        let profile = registry.register(profile, false)?;

        let dispatcher = RequestDispatcher::new();
        dispatcher.add_processor(Arc::new(SetGetProcessor::new(
            registry.clone(),
            transport.clone(),
        )));
        dispatcher.add_processor(Arc::new(AnnounceProcessor::new(
            registry.clone(),
            remotes.clone(),
            transport.clone(),
        )));
        dispatcher.add_processor(Arc::new(DiscoveryProcessor::new(
            remotes.clone(),
            proxies.clone(),
            local,
        )));

        info!(node = %local, "node started");

        Ok(Node {
            config,
            transport,
            registry,
            remotes,
            dispatcher,
            proxies,
            profile,
            next_tid: AtomicU16::new(0),
            counters: Counters::default(),
        })
    }

    pub fn local_node(&self) -> NodeId {
        self.transport.local_node()
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<LocalRegistry> {
        &self.registry
    }

    pub fn remotes(&self) -> &Arc<RemoteRegistry> {
        &self.remotes
    }

    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    /// The local node profile object
    pub fn profile(&self) -> &LocalObjectRef {
        &self.profile
    }

    /// Register a local device object
    ///
    /// With `announce_changes` configured, committed changes of its
    /// observable properties are announced to the group.
    pub fn register(&self, object: LocalObject, auto_assign: bool) -> EnlResult<LocalObjectRef> {
        if self.config.announce_changes {
            object.add_delegate(Arc::new(AnnounceDelegate::new(self.transport.clone())));
        }
        self.registry.register(object, auto_assign)
    }

    /// Proxy for an object at another node, created on first use
    pub fn remote(&self, node: NodeId, eoj: Eoj) -> EnlResult<RemoteObjectRef> {
        let (remote, _) = self
            .remotes
            .get_or_insert_with(node, eoj, || self.proxies.create(node, eoj))?;
        Ok(remote)
    }

    /// Announce this node's device objects (0xD5) to the group
    pub fn announce_instance_list(&self) -> EnlResult<()> {
        let list = self
            .profile
            .force_get_data(Epc::INSTANCE_LIST_NOTIFICATION)
            .ok_or(EnlError::UnknownProperty {
                eoj: Eoj::NODE_PROFILE,
                epc: Epc::INSTANCE_LIST_NOTIFICATION,
            })?;

        let frame = self
            .group_frame(Esv::Inf)
            .property(Property::new(Epc::INSTANCE_LIST_NOTIFICATION, list.data().clone()))
            .build();
        self.transport.send(frame)
    }

    /// Ask every node for its instance list (0xD6)
    ///
    /// Replies are picked up by discovery as they arrive.
    pub fn discover(&self) -> EnlResult<()> {
        let frame = self
            .group_frame(Esv::Get)
            .property(Property::request(Epc::SELF_NODE_INSTANCE_LIST))
            .build();
        self.transport.send(frame)
    }

    fn group_frame(&self, esv: Esv) -> FrameBuilder {
        let tid = Tid(self.next_tid.fetch_add(1, Ordering::Relaxed));
        FrameBuilder::new(self.local_node(), Receiver::Group, esv)
            .tid(tid)
            .seoj(Eoj::NODE_PROFILE)
            .deoj(Eoj::NODE_PROFILE)
    }

    /// Process one inbound frame; true if any processor handled it
    pub fn handle_frame(&self, frame: &Frame) -> bool {
        self.counters.frames_in.fetch_add(1, Ordering::Relaxed);

        if !frame.receiver.reaches(self.local_node()) {
            self.counters.frames_ignored.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let handled = self.dispatcher.dispatch(frame);
        if handled {
            self.counters.frames_handled.fetch_add(1, Ordering::Relaxed);
        }
        handled
    }

    /// Inbound queue sized from the configuration
    pub fn inbound_channel(&self) -> (mpsc::Sender<Frame>, mpsc::Receiver<Frame>) {
        mpsc::channel(self.config.inbound_buffer)
    }

    /// Drain `inbound`, handing each frame to its own blocking worker
    ///
    /// The task ends once every sender is dropped.
    pub fn spawn_inbound(self: &Arc<Self>, mut inbound: mpsc::Receiver<Frame>) -> JoinHandle<()> {
        let node = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(frame) = inbound.recv().await {
                let worker = node.clone();
                tokio::task::spawn_blocking(move || {
                    worker.handle_frame(&frame);
                });
            }
            debug!(node = %node.local_node(), "inbound queue closed");
        })
    }

    pub fn stats(&self) -> NodeStats {
        NodeStats {
            frames_in: self.counters.frames_in.load(Ordering::Relaxed),
            frames_handled: self.counters.frames_handled.load(Ordering::Relaxed),
            frames_ignored: self.counters.frames_ignored.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("node", &self.local_node())
            .field("local_objects", &self.registry.len())
            .field("remote_objects", &self.remotes.len())
            .finish()
    }
}
