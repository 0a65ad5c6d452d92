//! In-memory network simulator
//!
//! Frames are delivered synchronously on the sending thread. Each node
//! attaches through an `Endpoint`, which is both its transport and its
//! transaction manager: replies matching an in-flight transaction are
//! handed to that transaction before the node sees them.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use parking_lot::{Condvar, Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use enl_core::{
    EnlError, EnlResult, Eoj, Esv, Frame, FrameBuilder, NodeId, Receiver, Tid, Transport,
};
use enl_remote::{Transaction, TransactionConfig, TransactionListener, TransactionManager};
use enl_runtime::Node;

/// Behaviour of a directed link
#[derive(Clone, Debug, PartialEq)]
pub struct LinkConfig {
    /// Probability a frame is dropped (0.0 - 1.0)
    pub loss_rate: f64,
}

impl LinkConfig {
    /// Every frame arrives
    pub fn perfect() -> Self {
        LinkConfig { loss_rate: 0.0 }
    }

    pub fn lossy(loss_rate: f64) -> Self {
        LinkConfig {
            loss_rate: loss_rate.clamp(0.0, 1.0),
        }
    }

    /// No frame arrives
    pub fn dead() -> Self {
        LinkConfig { loss_rate: 1.0 }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::perfect()
    }
}

/// Delivery counters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NetworkStats {
    pub sent: u64,
    pub delivered: u64,
    pub dropped: u64,
}

/// Network shared by every simulated node
pub struct SimulatedNetwork {
    endpoints: RwLock<BTreeMap<NodeId, Arc<Endpoint>>>,
    links: Mutex<HashMap<(NodeId, NodeId), LinkConfig>>,
    default_link: LinkConfig,
    rng: Mutex<StdRng>,
    stats: Mutex<NetworkStats>,
}

impl SimulatedNetwork {
    /// Perfect network
    pub fn new() -> Arc<Self> {
        Self::with_seed(LinkConfig::perfect(), 0)
    }

    pub fn with_seed(default_link: LinkConfig, seed: u64) -> Arc<Self> {
        Arc::new(SimulatedNetwork {
            endpoints: RwLock::new(BTreeMap::new()),
            links: Mutex::new(HashMap::new()),
            default_link,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            stats: Mutex::new(NetworkStats::default()),
        })
    }

    /// Endpoint for a node, created on first use
    pub fn endpoint(self: &Arc<Self>, node: NodeId) -> Arc<Endpoint> {
        self.endpoints
            .write()
            .entry(node)
            .or_insert_with(|| Endpoint::new(node, Arc::downgrade(self)))
            .clone()
    }

    /// Override the link from one node to another
    pub fn set_link(&self, from: NodeId, to: NodeId, config: LinkConfig) {
        self.links.lock().insert((from, to), config);
    }

    fn dropped(&self, from: NodeId, to: NodeId) -> bool {
        let loss_rate = self
            .links
            .lock()
            .get(&(from, to))
            .map_or(self.default_link.loss_rate, |l| l.loss_rate);

        if loss_rate <= 0.0 {
            return false;
        }
        self.rng.lock().gen::<f64>() < loss_rate
    }

    /// Deliver a frame to every node it reaches, except its sender
    pub fn deliver(&self, frame: Frame) {
        let targets: Vec<_> = self
            .endpoints
            .read()
            .values()
            .filter(|e| e.node != frame.sender && frame.receiver.reaches(e.node))
            .cloned()
            .collect();

        self.stats.lock().sent += 1;

        for endpoint in targets {
            if self.dropped(frame.sender, endpoint.node) {
                trace!(from = %frame.sender, to = %endpoint.node, esv = ?frame.esv, "frame dropped");
                self.stats.lock().dropped += 1;
                continue;
            }
            self.stats.lock().delivered += 1;
            endpoint.accept(&frame);
        }
    }

    pub fn stats(&self) -> NetworkStats {
        self.stats.lock().clone()
    }
}

/// A node's attachment to the simulated network
pub struct Endpoint {
    node: NodeId,
    this: Weak<Endpoint>,
    network: Weak<SimulatedNetwork>,
    handler: RwLock<Option<Weak<Node>>>,
    pending: Mutex<Vec<Arc<Shared>>>,
    next_tid: AtomicU16,
}

impl Endpoint {
    fn new(node: NodeId, network: Weak<SimulatedNetwork>) -> Arc<Self> {
        Arc::new_cyclic(|this| Endpoint {
            node,
            this: this.clone(),
            network,
            handler: RwLock::new(None),
            pending: Mutex::new(Vec::new()),
            next_tid: AtomicU16::new(0x8000),
        })
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Hand inbound frames to `node`
    pub fn attach(&self, node: &Arc<Node>) {
        *self.handler.write() = Some(Arc::downgrade(node));
    }

    /// Transactions still waiting for replies
    pub fn pending_count(&self) -> usize {
        let mut pending = self.pending.lock();
        pending.retain(|p| !p.is_finished());
        pending.len()
    }

    fn accept(&self, frame: &Frame) {
        let matched: Vec<_> = {
            let mut pending = self.pending.lock();
            pending.retain(|p| !p.is_finished());
            pending.iter().filter(|p| p.matches(frame)).cloned().collect()
        };
        for transaction in matched {
            transaction.receive(frame);
        }

        let node = self.handler.read().as_ref().and_then(Weak::upgrade);
        if let Some(node) = node {
            node.handle_frame(frame);
        }
    }
}

impl Transport for Endpoint {
    fn local_node(&self) -> NodeId {
        self.node
    }

    fn send(&self, frame: Frame) -> EnlResult<()> {
        let network = self
            .network
            .upgrade()
            .ok_or_else(|| EnlError::Transport("network shut down".into()))?;
        network.deliver(frame);
        Ok(())
    }
}

impl TransactionManager for Endpoint {
    fn local_node(&self) -> NodeId {
        self.node
    }

    fn create(&self, config: TransactionConfig) -> EnlResult<Box<dyn Transaction>> {
        let endpoint = self
            .this
            .upgrade()
            .ok_or_else(|| EnlError::Transport("endpoint dropped".into()))?;
        let tid = Tid(self.next_tid.fetch_add(1, Ordering::Relaxed));

        Ok(Box::new(LoopbackTransaction {
            endpoint,
            shared: Arc::new(Shared::new(tid, &config)),
            config,
            timeout: Duration::from_secs(1),
        }))
    }
}

fn is_reply(esv: Esv) -> bool {
    esv.is_failure()
        || matches!(
            esv,
            Esv::SetRes | Esv::GetRes | Esv::Inf | Esv::SetGetRes | Esv::InfCRes
        )
}

/// State shared between a transaction and the endpoint routing replies
struct Shared {
    tid: Tid,
    receiver: Receiver,
    deoj: Eoj,
    listeners: Mutex<Vec<Arc<dyn TransactionListener>>>,
    finished: Mutex<bool>,
    done: Condvar,
}

impl Shared {
    fn new(tid: Tid, config: &TransactionConfig) -> Self {
        Shared {
            tid,
            receiver: config.receiver,
            deoj: config.deoj,
            listeners: Mutex::new(Vec::new()),
            finished: Mutex::new(false),
            done: Condvar::new(),
        }
    }

    /// A unicast request to one object completes on its first reply
    fn single_reply(&self) -> bool {
        !self.receiver.is_group() && !self.deoj.is_all_instance()
    }

    fn is_finished(&self) -> bool {
        *self.finished.lock()
    }

    fn matches(&self, frame: &Frame) -> bool {
        if frame.tid != self.tid || !is_reply(frame.esv) || !self.receiver.reaches(frame.sender) {
            return false;
        }
        if self.deoj.is_all_instance() {
            frame.seoj.class_eoj() == self.deoj.class_eoj()
        } else {
            frame.seoj == self.deoj
        }
    }

    fn listeners(&self) -> Vec<Arc<dyn TransactionListener>> {
        self.listeners.lock().clone()
    }

    fn receive(&self, frame: &Frame) {
        if self.is_finished() {
            return;
        }
        for listener in self.listeners() {
            listener.receive(frame);
        }
        if self.single_reply() {
            self.finish();
        }
    }

    fn finish(&self) {
        {
            let mut finished = self.finished.lock();
            if *finished {
                return;
            }
            *finished = true;
            self.done.notify_all();
        }
        for listener in self.listeners() {
            listener.finish();
        }
    }

    fn join(&self) {
        let mut finished = self.finished.lock();
        while !*finished {
            self.done.wait(&mut finished);
        }
    }
}

/// Transaction routed over the simulated network
pub struct LoopbackTransaction {
    endpoint: Arc<Endpoint>,
    shared: Arc<Shared>,
    config: TransactionConfig,
    timeout: Duration,
}

impl LoopbackTransaction {
    /// Finish the transaction once its timeout elapses
    fn arm_timer(&self) {
        let shared = Arc::downgrade(&self.shared);
        let timeout = self.timeout;
        thread::spawn(move || {
            thread::sleep(timeout);
            if let Some(shared) = shared.upgrade() {
                shared.finish();
            }
        });
    }
}

impl Transaction for LoopbackTransaction {
    fn tid(&self) -> Tid {
        self.shared.tid
    }

    fn add_listener(&mut self, listener: Arc<dyn TransactionListener>) {
        self.shared.listeners.lock().push(listener);
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    fn execute(&mut self) -> EnlResult<()> {
        let frame = FrameBuilder::new(self.config.sender, self.config.receiver, self.config.esv)
            .tid(self.shared.tid)
            .seoj(self.config.seoj)
            .deoj(self.config.deoj)
            .first(self.config.properties.clone())
            .build();

        if self.config.response_required {
            self.endpoint.pending.lock().push(self.shared.clone());
        }
        for listener in self.shared.listeners() {
            listener.begin(self.shared.tid);
        }

        let result = self.endpoint.send(frame.clone());
        for listener in self.shared.listeners() {
            listener.send(&frame, result.is_ok());
        }

        if result.is_err() || !self.config.response_required {
            self.shared.finish();
        } else if !self.shared.is_finished() {
            self.arm_timer();
        }
        result
    }

    fn join(&self) -> EnlResult<()> {
        self.shared.join();
        Ok(())
    }

    fn finish(&self) {
        self.shared.finish();
    }
}
