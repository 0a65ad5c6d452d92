//! Property engine - one per local device object
//!
//! A `LocalObject` owns one value per descriptor of its `ObjectInfo`,
//! enforces permissions and constraints, runs the delegate chain and
//! gates change notification on change detection.
//!
//! Every accessor takes the object's re-entrant operation lock, so a
//! batch holding the lock sees no interleaved access from other threads
//! while still being able to call the accessors itself.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use enl_core::{ClassEoj, Eoj, Epc, ObjectInfo, PropertyDescriptor};

use crate::{same_delegate, DelegateRef, GetState, NotifyState, ObjectData, SetState};

/// What happens to buffered history once it has been announced
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtraDataPolicy {
    /// History stays until a set replaces the value
    #[default]
    Retain,
    /// An announce-mode read clears the history it expanded
    FlushOnAnnounce,
}

/// Local object configuration
#[derive(Clone, Debug, Default)]
pub struct LocalObjectConfig {
    pub extra_data_policy: ExtraDataPolicy,
}

/// Guard held for the duration of an atomic operation on one object
pub type ObjectLock<'a> = ReentrantMutexGuard<'a, ()>;

/// Property engine for one local object
pub struct LocalObject {
    eoj: RwLock<Eoj>,
    info: ObjectInfo,
    config: LocalObjectConfig,
    op_lock: ReentrantMutex<()>,
    values: Mutex<HashMap<Epc, ObjectData>>,
    delegates: RwLock<Vec<DelegateRef>>,
}

impl LocalObject {
    /// Create an object with every value at its default
    pub fn new(eoj: Eoj, info: ObjectInfo) -> Self {
        Self::with_config(eoj, info, LocalObjectConfig::default())
    }

    pub fn with_config(eoj: Eoj, info: ObjectInfo, config: LocalObjectConfig) -> Self {
        let values = info
            .iter()
            .map(|d| (d.epc, ObjectData::new(d.default.clone())))
            .collect();

        LocalObject {
            eoj: RwLock::new(eoj),
            info,
            config,
            op_lock: ReentrantMutex::new(()),
            values: Mutex::new(values),
            delegates: RwLock::new(Vec::new()),
        }
    }

    /// Create an object of `info`'s class with a placeholder instance
    /// code, to be assigned at registration
    pub fn unassigned(info: ObjectInfo) -> Self {
        let eoj = info.class_eoj().all_instances();
        Self::new(eoj, info)
    }

    pub fn eoj(&self) -> Eoj {
        *self.eoj.read()
    }

    pub fn class_eoj(&self) -> ClassEoj {
        self.eoj().class_eoj()
    }

    pub(crate) fn set_eoj(&self, eoj: Eoj) {
        *self.eoj.write() = eoj;
    }

    pub fn info(&self) -> &ObjectInfo {
        &self.info
    }

    pub fn config(&self) -> &LocalObjectConfig {
        &self.config
    }

    /// Acquire the operation lock for a multi-step atomic sequence
    pub fn lock(&self) -> ObjectLock<'_> {
        self.op_lock.lock()
    }

    pub fn descriptor(&self, epc: Epc) -> PropertyDescriptor {
        self.info.descriptor(epc)
    }

    pub fn is_gettable(&self, epc: Epc) -> bool {
        self.info.get(epc).is_some_and(|d| d.gettable)
    }

    pub fn is_settable(&self, epc: Epc) -> bool {
        self.info.get(epc).is_some_and(|d| d.settable)
    }

    pub fn is_observable(&self, epc: Epc) -> bool {
        self.info.get(epc).is_some_and(|d| d.observable)
    }

    pub fn add_delegate(&self, delegate: DelegateRef) {
        self.delegates.write().push(delegate);
    }

    /// Remove a delegate by identity
    pub fn remove_delegate(&self, delegate: &DelegateRef) -> bool {
        let mut delegates = self.delegates.write();
        let before = delegates.len();
        delegates.retain(|d| !same_delegate(d, delegate));
        delegates.len() != before
    }

    pub fn delegate_count(&self) -> usize {
        self.delegates.read().len()
    }

    fn delegates_snapshot(&self) -> Vec<DelegateRef> {
        self.delegates.read().clone()
    }

    fn stored(&self, epc: Epc) -> Option<ObjectData> {
        self.values.lock().get(&epc).cloned()
    }

    /// Read a gettable property through the delegate chain
    pub fn get_data(&self, epc: Epc) -> Option<ObjectData> {
        let _guard = self.lock();

        if !self.is_gettable(epc) {
            debug!(eoj = %self.eoj(), %epc, "get refused: not gettable");
            return None;
        }

        self.force_get_data(epc)
    }

    /// Read a property ignoring permissions
    pub fn force_get_data(&self, epc: Epc) -> Option<ObjectData> {
        let _guard = self.lock();

        let Some(stored) = self.stored(epc) else {
            debug!(eoj = %self.eoj(), %epc, "get on unknown property");
            return None;
        };

        let mut state = GetState::new(stored);
        for delegate in self.delegates_snapshot() {
            delegate.get_data(&mut state, self, epc);
            if state.is_done() {
                break;
            }
        }

        if state.is_fail() {
            debug!(eoj = %self.eoj(), %epc, messages = ?state.messages(), "get failed in delegate");
            return None;
        }

        Some(state.into_data())
    }

    /// Write a settable property whose value satisfies its constraint
    pub fn set_data(&self, epc: Epc, data: impl Into<ObjectData>) -> bool {
        let data = data.into();
        let _guard = self.lock();

        let Some(descriptor) = self.info.get(epc) else {
            debug!(eoj = %self.eoj(), %epc, "set on unknown property");
            return false;
        };

        if !descriptor.settable {
            debug!(eoj = %self.eoj(), %epc, "set refused: not settable");
            return false;
        }

        if !descriptor.accepts(data.data()) {
            debug!(eoj = %self.eoj(), %epc, len = data.len(), "set refused: constraint violated");
            return false;
        }

        self.force_set_data(epc, data)
    }

    /// Write a property ignoring permissions and constraints
    pub fn force_set_data(&self, epc: Epc, data: impl Into<ObjectData>) -> bool {
        let data = data.into();
        let _guard = self.lock();

        let Some(current) = self.stored(epc) else {
            debug!(eoj = %self.eoj(), %epc, "set on unknown property");
            return false;
        };

        let mut state = SetState::new(data, current);
        for delegate in self.delegates_snapshot() {
            delegate.set_data(&mut state, self, epc);
            if state.is_done() {
                break;
            }
        }

        if state.is_fail() {
            debug!(eoj = %self.eoj(), %epc, messages = ?state.messages(), "set failed in delegate");
            return false;
        }

        self.values.lock().insert(epc, state.new_data().clone());
        trace!(eoj = %self.eoj(), %epc, "value stored");

        if state.is_changed() {
            self.notify_data_changed(epc, state.new_data().clone(), state.cur_data().clone());
        }

        true
    }

    /// Run every delegate's notification hook
    pub fn notify_data_changed(&self, epc: Epc, cur_data: ObjectData, old_data: ObjectData) {
        let _guard = self.lock();

        let mut state = NotifyState::new(cur_data, old_data);
        for delegate in self.delegates_snapshot() {
            delegate.notify_data_changed(&mut state, self, epc);
        }
    }

    /// Drop buffered history of a property, keeping its value
    pub fn clear_extra(&self, epc: Epc) {
        let _guard = self.lock();
        if let Some(data) = self.values.lock().get_mut(&epc) {
            data.clear_extra();
        }
    }
}

impl std::fmt::Debug for LocalObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalObject")
            .field("eoj", &self.eoj())
            .field("properties", &self.info.len())
            .field("delegates", &self.delegate_count())
            .finish()
    }
}

/// Shared handle to a local object
pub type LocalObjectRef = Arc<LocalObject>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LocalObjectDelegate;
    use enl_core::{PropertyDescriptor, ValueSetConstraint};
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample_info() -> ObjectInfo {
        ObjectInfo::builder(ClassEoj::new(0x01, 0x30))
            .add(
                PropertyDescriptor::new(Epc(0x80))
                    .gettable()
                    .settable()
                    .observable()
                    .constraint(ValueSetConstraint::new([vec![0x30], vec![0x31]]))
                    .default_value(vec![0x31]),
            )
            .add(PropertyDescriptor::new(Epc(0xB0)).gettable().settable().default_value(vec![0x41]))
            .add(PropertyDescriptor::new(Epc(0xE0)).gettable().default_value(vec![0x12, 0x34]))
            .add(PropertyDescriptor::new(Epc(0xF0)).settable().default_value(vec![0x00]))
            .build()
    }

    fn sample_object() -> LocalObject {
        LocalObject::new(Eoj::new(0x01, 0x30, 0x01), sample_info())
    }

    #[derive(Default)]
    struct Counter {
        gets: AtomicUsize,
        sets: AtomicUsize,
        notifies: AtomicUsize,
    }

    impl LocalObjectDelegate for Counter {
        fn get_data(&self, _: &mut GetState, _: &LocalObject, _: Epc) {
            self.gets.fetch_add(1, Ordering::SeqCst);
        }
        fn set_data(&self, _: &mut SetState, _: &LocalObject, _: Epc) {
            self.sets.fetch_add(1, Ordering::SeqCst);
        }
        fn notify_data_changed(&self, _: &mut NotifyState, _: &LocalObject, _: Epc) {
            self.notifies.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Done;
    impl LocalObjectDelegate for Done {
        fn get_data(&self, state: &mut GetState, _: &LocalObject, _: Epc) {
            state.set_done();
        }
        fn set_data(&self, state: &mut SetState, _: &LocalObject, _: Epc) {
            state.set_done();
        }
    }

    struct Fail;
    impl LocalObjectDelegate for Fail {
        fn get_data(&self, state: &mut GetState, _: &LocalObject, _: Epc) {
            state.set_fail();
        }
        fn set_data(&self, state: &mut SetState, _: &LocalObject, _: Epc) {
            state.set_fail();
        }
    }

    struct Synthesize;
    impl LocalObjectDelegate for Synthesize {
        fn get_data(&self, state: &mut GetState, _: &LocalObject, epc: Epc) {
            if epc == Epc(0xE0) {
                state.set_data(ObjectData::new(vec![0xAB, 0xCD]));
            }
        }
    }

    struct Silence;
    impl LocalObjectDelegate for Silence {
        fn set_data(&self, state: &mut SetState, _: &LocalObject, _: Epc) {
            let new = state.new_data().clone();
            state.set_cur_data(new);
        }
    }

    #[test]
    fn test_values_start_at_defaults() {
        let object = sample_object();
        assert_eq!(object.get_data(Epc(0x80)).unwrap().data().as_ref(), &[0x31]);
        assert_eq!(object.get_data(Epc(0xE0)).unwrap().data().as_ref(), &[0x12, 0x34]);
    }

    #[test]
    fn test_get_requires_gettable() {
        let object = sample_object();
        assert!(object.get_data(Epc(0xF0)).is_none());
        assert_eq!(object.force_get_data(Epc(0xF0)).unwrap().data().as_ref(), &[0x00]);
        assert!(object.get_data(Epc(0x99)).is_none());
        assert!(object.force_get_data(Epc(0x99)).is_none());
    }

    #[test]
    fn test_set_requires_settable() {
        let object = sample_object();
        assert!(!object.set_data(Epc(0xE0), vec![0x00, 0x01]));
        assert_eq!(object.force_get_data(Epc(0xE0)).unwrap().data().as_ref(), &[0x12, 0x34]);

        assert!(object.force_set_data(Epc(0xE0), vec![0x00, 0x01]));
        assert_eq!(object.force_get_data(Epc(0xE0)).unwrap().data().as_ref(), &[0x00, 0x01]);
    }

    #[test]
    fn test_constraint_only_checked_on_plain_set() {
        let object = sample_object();
        assert!(!object.set_data(Epc(0x80), vec![0x41]));
        assert_eq!(object.get_data(Epc(0x80)).unwrap().data().as_ref(), &[0x31]);

        assert!(object.force_set_data(Epc(0x80), vec![0x41]));
        assert_eq!(object.get_data(Epc(0x80)).unwrap().data().as_ref(), &[0x41]);
    }

    #[test]
    fn test_force_paths_still_run_delegates() {
        let object = sample_object();
        let counter = Arc::new(Counter::default());
        object.add_delegate(counter.clone());

        object.force_get_data(Epc(0xF0));
        object.force_set_data(Epc(0xF0), vec![0x01]);

        assert_eq!(counter.gets.load(Ordering::SeqCst), 1);
        assert_eq!(counter.sets.load(Ordering::SeqCst), 1);
        assert_eq!(counter.notifies.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_same_value_notifies_once() {
        let object = sample_object();
        let counter = Arc::new(Counter::default());
        object.add_delegate(counter.clone());

        assert!(object.set_data(Epc(0x80), vec![0x30]));
        assert!(object.set_data(Epc(0x80), vec![0x30]));
        assert_eq!(counter.notifies.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_distinct_values_notify_twice() {
        let object = sample_object();
        let counter = Arc::new(Counter::default());
        object.add_delegate(counter.clone());

        assert!(object.set_data(Epc(0xB0), vec![0x42]));
        assert!(object.set_data(Epc(0xB0), vec![0x43]));
        assert_eq!(counter.notifies.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_done_stops_later_delegates() {
        let object = sample_object();
        let counter = Arc::new(Counter::default());
        object.add_delegate(Arc::new(Done));
        object.add_delegate(counter.clone());

        assert!(object.get_data(Epc(0x80)).is_some());
        assert!(object.set_data(Epc(0x80), vec![0x30]));

        assert_eq!(counter.gets.load(Ordering::SeqCst), 0);
        assert_eq!(counter.sets.load(Ordering::SeqCst), 0);
        // notification still reaches every delegate
        assert_eq!(counter.notifies.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fail_without_done_vetoes_set() {
        let object = sample_object();
        let counter = Arc::new(Counter::default());
        object.add_delegate(Arc::new(Fail));
        object.add_delegate(counter.clone());

        assert!(!object.set_data(Epc(0x80), vec![0x30]));
        assert_eq!(counter.sets.load(Ordering::SeqCst), 1);
        assert_eq!(counter.notifies.load(Ordering::SeqCst), 0);
        assert!(object.get_data(Epc(0x80)).is_none());
        assert_eq!(object.stored(Epc(0x80)).unwrap().data().as_ref(), &[0x31]);
    }

    #[test]
    fn test_delegate_synthesizes_value() {
        let object = sample_object();
        object.add_delegate(Arc::new(Synthesize));
        assert_eq!(object.get_data(Epc(0xE0)).unwrap().data().as_ref(), &[0xAB, 0xCD]);
        assert_eq!(object.stored(Epc(0xE0)).unwrap().data().as_ref(), &[0x12, 0x34]);
    }

    #[test]
    fn test_delegate_can_suppress_notification() {
        let object = sample_object();
        let counter = Arc::new(Counter::default());
        object.add_delegate(Arc::new(Silence));
        object.add_delegate(counter.clone());

        assert!(object.set_data(Epc(0xB0), vec![0x50]));
        assert_eq!(object.get_data(Epc(0xB0)).unwrap().data().as_ref(), &[0x50]);
        assert_eq!(counter.notifies.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_remove_delegate_by_identity() {
        let object = sample_object();
        let fail: DelegateRef = Arc::new(Fail);
        object.add_delegate(fail.clone());
        assert!(object.get_data(Epc(0x80)).is_none());

        assert!(object.remove_delegate(&fail));
        assert!(!object.remove_delegate(&fail));
        assert!(object.get_data(Epc(0x80)).is_some());
    }

    #[test]
    fn test_reentrant_delegate() {
        struct Mirror;
        impl LocalObjectDelegate for Mirror {
            fn get_data(&self, state: &mut GetState, object: &LocalObject, epc: Epc) {
                if epc == Epc(0xB0) {
                    if let Some(v) = object.get_data(Epc(0x80)) {
                        state.set_data(v);
                    }
                }
            }
        }

        let object = sample_object();
        object.add_delegate(Arc::new(Mirror));
        assert_eq!(object.get_data(Epc(0xB0)).unwrap().data().as_ref(), &[0x31]);
    }

    proptest! {
        #[test]
        fn prop_unsettable_property_never_changes(value in proptest::collection::vec(any::<u8>(), 0..8)) {
            let object = sample_object();
            prop_assert!(!object.set_data(Epc(0xE0), value.clone()));
            let untouched = object.force_get_data(Epc(0xE0)).unwrap();
            prop_assert_eq!(untouched.data().as_ref(), &[0x12u8, 0x34][..]);
            prop_assert!(object.force_set_data(Epc(0xE0), value.clone()));
            let forced = object.force_get_data(Epc(0xE0)).unwrap();
            prop_assert_eq!(forced.data().as_ref(), value.as_slice());
        }

        #[test]
        fn prop_notifications_match_value_changes(values in proptest::collection::vec(0x40u8..0x44, 1..16)) {
            let object = sample_object();
            let counter = Arc::new(Counter::default());
            object.add_delegate(counter.clone());

            let mut expected = 0;
            let mut current = 0x41u8;
            for v in values {
                if v != current {
                    expected += 1;
                    current = v;
                }
                prop_assert!(object.set_data(Epc(0xB0), vec![v]));
            }
            prop_assert_eq!(counter.notifies.load(Ordering::SeqCst), expected);
        }
    }
}
