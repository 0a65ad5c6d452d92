//! Request/response transaction seam
//!
//! The transaction engine (reply matching by transaction id, timeouts,
//! retransmission) lives outside this layer. Proxies only create a
//! transaction, listen to it and wait for it to finish.

use std::sync::Arc;
use std::time::Duration;

use enl_core::{EnlResult, Eoj, Esv, Frame, NodeId, Property, Receiver, Tid};

/// Parameters of one request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionConfig {
    pub sender: NodeId,
    pub receiver: Receiver,
    pub seoj: Eoj,
    pub deoj: Eoj,
    pub esv: Esv,
    pub properties: Vec<Property>,
    pub response_required: bool,
}

/// Observer of a transaction's life cycle
///
/// Callbacks may arrive on any thread.
pub trait TransactionListener: Send + Sync {
    fn begin(&self, _tid: Tid) {}

    fn send(&self, _frame: &Frame, _success: bool) {}

    fn receive(&self, _frame: &Frame) {}

    fn finish(&self) {}
}

/// One in-flight request
pub trait Transaction: Send {
    fn tid(&self) -> Tid;

    fn add_listener(&mut self, listener: Arc<dyn TransactionListener>);

    fn set_timeout(&mut self, timeout: Duration);

    /// Send the request; replies arrive through the listeners
    fn execute(&mut self) -> EnlResult<()>;

    /// Block until the transaction finishes
    fn join(&self) -> EnlResult<()>;

    /// Stop accepting replies and notify `finish`
    fn finish(&self);
}

/// Factory for transactions
pub trait TransactionManager: Send + Sync {
    /// Node requests are sent from
    fn local_node(&self) -> NodeId;

    fn create(&self, config: TransactionConfig) -> EnlResult<Box<dyn Transaction>>;
}
