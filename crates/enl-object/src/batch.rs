//! Atomic set-then-get batch operations
//!
//! A batch runs every queued set, then every queued get, against one
//! object while holding that object's operation lock. A failing
//! property is recorded and never aborts the rest of the batch.

use bytes::Bytes;
use tracing::trace;

use enl_core::{EnlError, EnlResult, Epc, Property};

use crate::{ExtraDataPolicy, LocalObject};

/// Result for one property of a batch
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyOutcome {
    /// Property as it goes into the reply
    pub property: Property,
    pub success: bool,
}

impl PropertyOutcome {
    fn ok(epc: Epc, edt: Bytes) -> Self {
        PropertyOutcome {
            property: Property { epc, edt },
            success: true,
        }
    }

    fn failed(epc: Epc, edt: Bytes) -> Self {
        PropertyOutcome {
            property: Property { epc, edt },
            success: false,
        }
    }
}

/// Batch of sets and gets against one object
#[derive(Clone, Debug, Default)]
pub struct BatchOperation {
    announce: bool,
    sets: Vec<Property>,
    gets: Vec<Epc>,
    set_results: Vec<PropertyOutcome>,
    get_results: Vec<PropertyOutcome>,
    success: bool,
    done: bool,
}

impl BatchOperation {
    pub fn new() -> Self {
        BatchOperation::default()
    }

    /// Batch whose gets are announce reads
    ///
    /// Announce reads bypass the gettable check for observable
    /// properties and expand buffered history into repeated entries.
    pub fn announce() -> Self {
        BatchOperation {
            announce: true,
            ..Default::default()
        }
    }

    pub fn is_announce(&self) -> bool {
        self.announce
    }

    pub fn add_set(&mut self, property: Property) {
        self.sets.push(property);
    }

    pub fn add_get(&mut self, epc: Epc) {
        self.gets.push(epc);
    }

    /// Clear queued requests and results for reuse
    pub fn initialize(&mut self) {
        self.sets.clear();
        self.gets.clear();
        self.set_results.clear();
        self.get_results.clear();
        self.success = false;
        self.done = false;
    }

    /// Execute the batch against `object`
    ///
    /// Returns the overall success. A completed batch must be
    /// re-initialized before it runs again.
    pub fn run(&mut self, object: &LocalObject) -> EnlResult<bool> {
        if self.done {
            return Err(EnlError::BatchCompleted);
        }

        let _guard = object.lock();
        let mut success = true;

        for property in &self.sets {
            if object.set_data(property.epc, property.edt.clone()) {
                self.set_results
                    .push(PropertyOutcome::ok(property.epc, Bytes::new()));
            } else {
                success = false;
                self.set_results
                    .push(PropertyOutcome::failed(property.epc, property.edt.clone()));
            }
        }

        for &epc in &self.gets {
            let data = if self.announce {
                let readable = object.is_gettable(epc) || object.is_observable(epc);
                readable.then(|| object.force_get_data(epc)).flatten()
            } else {
                object.get_data(epc)
            };

            let Some(data) = data else {
                success = false;
                self.get_results
                    .push(PropertyOutcome::failed(epc, Bytes::new()));
                continue;
            };

            if self.announce && data.extra_size() > 0 {
                for extra in data.extra() {
                    self.get_results.push(PropertyOutcome::ok(epc, extra.clone()));
                }
                if object.config().extra_data_policy == ExtraDataPolicy::FlushOnAnnounce {
                    object.clear_extra(epc);
                }
            } else {
                self.get_results
                    .push(PropertyOutcome::ok(epc, data.data().clone()));
            }
        }

        trace!(eoj = %object.eoj(), sets = self.sets.len(), gets = self.gets.len(), success, "batch complete");

        self.success = success;
        self.done = true;
        Ok(success)
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn set_results(&self) -> &[PropertyOutcome] {
        &self.set_results
    }

    pub fn get_results(&self) -> &[PropertyOutcome] {
        &self.get_results
    }

    /// Set results as reply properties
    pub fn set_properties(&self) -> Vec<Property> {
        self.set_results.iter().map(|o| o.property.clone()).collect()
    }

    /// Get results as reply properties
    pub fn get_properties(&self) -> Vec<Property> {
        self.get_results.iter().map(|o| o.property.clone()).collect()
    }
}
