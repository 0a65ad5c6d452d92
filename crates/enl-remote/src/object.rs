//! Remote object proxy
//!
//! A `RemoteObject` stands in for an object hosted by another node. It
//! caches nothing: every accessor is a round trip through the
//! transaction seam, and the calling thread blocks until the
//! transaction finishes or the proxy's timeout elapses.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::{Condvar, Mutex, RwLock};
use tracing::{debug, warn};

use enl_core::{
    EnlError, EnlResult, Eoj, Epc, Esv, Frame, NodeId, Property, PropertyMap, Receiver,
};
use enl_object::ObjectData;

use crate::{TransactionConfig, TransactionListener, TransactionManager};

/// Default bound on a single round trip
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_millis(2000);

/// Receives announcements delivered to a remote object
pub trait RemoteObjectObserver: Send + Sync {
    fn notify_data(&self, object: &RemoteObject, epc: Epc, data: &ObjectData);
}

impl<F> RemoteObjectObserver for F
where
    F: Fn(&RemoteObject, Epc, &ObjectData) + Send + Sync,
{
    fn notify_data(&self, object: &RemoteObject, epc: Epc, data: &ObjectData) {
        self(object, epc, data)
    }
}

/// Observer handle
pub type ObserverRef = Arc<dyn RemoteObjectObserver>;

/// Replies gathered for one transaction
#[derive(Default)]
struct Collected {
    frames: Vec<Frame>,
    send_failed: bool,
    finished: bool,
}

/// Listener that records replies and signals completion
#[derive(Default)]
struct ReplyCollector {
    state: Mutex<Collected>,
    finished: Condvar,
}

impl ReplyCollector {
    /// Wait for the transaction to finish, at most `timeout`
    fn wait(&self, timeout: Duration) -> Option<Collected> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while !state.finished {
            if self.finished.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }

        if !state.finished {
            return None;
        }
        Some(std::mem::take(&mut *state))
    }
}

impl TransactionListener for ReplyCollector {
    fn send(&self, _frame: &Frame, success: bool) {
        if !success {
            self.state.lock().send_failed = true;
        }
    }

    fn receive(&self, frame: &Frame) {
        self.state.lock().frames.push(frame.clone());
    }

    fn finish(&self) {
        let mut state = self.state.lock();
        state.finished = true;
        self.finished.notify_all();
    }
}

/// Proxy for an object hosted by another node
pub struct RemoteObject {
    node: NodeId,
    eoj: Eoj,
    source: Eoj,
    transactions: Arc<dyn TransactionManager>,
    timeout: RwLock<Duration>,
    observers: RwLock<Vec<ObserverRef>>,
}

impl RemoteObject {
    pub fn new(node: NodeId, eoj: Eoj, transactions: Arc<dyn TransactionManager>) -> Self {
        RemoteObject {
            node,
            eoj,
            source: Eoj::NODE_PROFILE,
            transactions,
            timeout: RwLock::new(DEFAULT_REMOTE_TIMEOUT),
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Use a different local object as the source of requests
    pub fn with_source(mut self, source: Eoj) -> Self {
        self.source = source;
        self
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn eoj(&self) -> Eoj {
        self.eoj
    }

    pub fn timeout(&self) -> Duration {
        *self.timeout.read()
    }

    /// Set the round-trip bound; zero is rejected
    pub fn set_timeout(&self, timeout: Duration) -> EnlResult<()> {
        if timeout.is_zero() {
            return Err(EnlError::InvalidTimeout);
        }
        *self.timeout.write() = timeout;
        Ok(())
    }

    /// Set the round-trip bound in milliseconds; non-positive is rejected
    pub fn set_timeout_ms(&self, millis: i64) -> EnlResult<()> {
        if millis <= 0 {
            return Err(EnlError::InvalidTimeout);
        }
        self.set_timeout(Duration::from_millis(millis as u64))
    }

    /// Read a property; every matching occurrence before completion is
    /// kept as history
    pub fn get_data(&self, epc: Epc) -> EnlResult<ObjectData> {
        let frames = self.round_trip(Esv::Get, Property::request(epc))?;
        let values = self.matching(&frames, Esv::GetRes, epc);

        if values.is_empty() {
            return Err(self.failure(epc, "no matching Get_Res"));
        }
        if values.iter().any(|v| v.is_empty()) {
            return Err(self.failure(epc, "empty payload in Get_Res"));
        }

        ObjectData::from_list(values).ok_or_else(|| self.failure(epc, "no value"))
    }

    /// Write a property with confirmation
    pub fn set_data(&self, epc: Epc, data: impl Into<Bytes>) -> EnlResult<()> {
        let frames = self.round_trip(Esv::SetC, Property::new(epc, data))?;
        let values = self.matching(&frames, Esv::SetRes, epc);

        match values.as_slice() {
            [accepted] if accepted.is_empty() => Ok(()),
            [_] => Err(self.failure(epc, "payload in Set_Res")),
            _ => Err(self.failure(epc, "no single matching Set_Res")),
        }
    }

    /// Ask the remote object to announce a property
    pub fn observe_data(&self, epc: Epc) -> EnlResult<ObjectData> {
        let frames = self.round_trip(Esv::InfReq, Property::request(epc))?;
        let values = self.matching(&frames, Esv::Inf, epc);

        match values.as_slice() {
            [value] if !value.is_empty() => Ok(ObjectData::new(value.clone())),
            [_] => Err(self.failure(epc, "empty payload in INF")),
            _ => Err(self.failure(epc, "no single matching INF")),
        }
    }

    pub fn is_gettable(&self, epc: Epc) -> EnlResult<bool> {
        Ok(self.property_map(Epc::GET_MAP)?.contains(epc))
    }

    pub fn is_settable(&self, epc: Epc) -> EnlResult<bool> {
        Ok(self.property_map(Epc::SET_MAP)?.contains(epc))
    }

    pub fn is_observable(&self, epc: Epc) -> EnlResult<bool> {
        Ok(self.property_map(Epc::ANNOUNCE_MAP)?.contains(epc))
    }

    fn property_map(&self, map: Epc) -> EnlResult<PropertyMap> {
        let data = self.get_data(map)?;
        PropertyMap::decode(data.data()).map_err(|e| EnlError::RemoteAccess(e.to_string()))
    }

    pub fn add_observer(&self, observer: ObserverRef) {
        self.observers.write().push(observer);
    }

    /// Remove an observer by identity
    pub fn remove_observer(&self, observer: &ObserverRef) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|o| {
            !std::ptr::eq(
                Arc::as_ptr(o) as *const (),
                Arc::as_ptr(observer) as *const (),
            )
        });
        observers.len() != before
    }

    pub fn count_observers(&self) -> usize {
        self.observers.read().len()
    }

    /// Announcement intake: fan out to observers in registration order
    pub fn notify_data(&self, epc: Epc, data: ObjectData) {
        let observers = self.observers.read().clone();
        for observer in observers {
            observer.notify_data(self, epc, &data);
        }
    }

    /// Payloads of `epc` in replies of kind `esv` from this object
    fn matching(&self, frames: &[Frame], esv: Esv, epc: Epc) -> Vec<Bytes> {
        frames
            .iter()
            .filter(|f| f.esv == esv && f.sender == self.node && f.seoj == self.eoj)
            .flat_map(|f| f.first.iter())
            .filter(|p| p.epc == epc)
            .map(|p| p.edt.clone())
            .collect()
    }

    fn round_trip(&self, esv: Esv, property: Property) -> EnlResult<Vec<Frame>> {
        let timeout = self.timeout();
        let config = TransactionConfig {
            sender: self.transactions.local_node(),
            receiver: Receiver::Node(self.node),
            seoj: self.source,
            deoj: self.eoj,
            esv,
            properties: vec![property],
            response_required: true,
        };

        let mut transaction = self
            .transactions
            .create(config)
            .map_err(|e| EnlError::RemoteAccess(e.to_string()))?;

        let collector = Arc::new(ReplyCollector::default());
        transaction.add_listener(collector.clone());
        transaction.set_timeout(timeout);
        transaction
            .execute()
            .map_err(|e| EnlError::RemoteAccess(e.to_string()))?;

        let Some(collected) = collector.wait(timeout) else {
            transaction.finish();
            warn!(node = %self.node, eoj = %self.eoj, ?esv, ?timeout, "remote request timed out");
            return Err(EnlError::RemoteAccess(format!(
                "no response from {} {} within {:?}",
                self.node, self.eoj, timeout
            )));
        };

        if collected.send_failed {
            return Err(EnlError::RemoteAccess(format!(
                "request to {} {} could not be sent",
                self.node, self.eoj
            )));
        }

        debug!(node = %self.node, eoj = %self.eoj, ?esv, replies = collected.frames.len(), "remote request finished");
        Ok(collected.frames)
    }

    fn failure(&self, epc: Epc, reason: &str) -> EnlError {
        debug!(node = %self.node, eoj = %self.eoj, %epc, reason, "remote access failed");
        EnlError::RemoteAccess(format!("{} {} {}: {}", self.node, self.eoj, epc, reason))
    }
}

impl std::fmt::Debug for RemoteObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteObject")
            .field("node", &self.node)
            .field("eoj", &self.eoj)
            .field("timeout", &self.timeout())
            .finish()
    }
}

/// Shared handle to a remote object
pub type RemoteObjectRef = Arc<RemoteObject>;
