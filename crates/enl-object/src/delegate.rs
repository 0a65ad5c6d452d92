//! Delegate protocol
//!
//! Delegates run in registration order. Each call receives a mutable
//! state object, so a delegate sees what earlier delegates decided and
//! may amend it:
//! - `done` stops the chain for this call
//! - `fail` marks the whole operation failed
//! - the carried value may be replaced
//!
//! Notification delegates always all run.

use std::sync::Arc;

use enl_core::Epc;

use crate::{LocalObject, ObjectData};

/// Per-call state of a get
#[derive(Clone, Debug)]
pub struct GetState {
    data: ObjectData,
    done: bool,
    fail: bool,
    messages: Vec<String>,
}

impl GetState {
    pub fn new(data: ObjectData) -> Self {
        GetState {
            data,
            done: false,
            fail: false,
            messages: Vec::new(),
        }
    }

    pub fn data(&self) -> &ObjectData {
        &self.data
    }

    pub fn set_data(&mut self, data: ObjectData) {
        self.data = data;
    }

    pub fn into_data(self) -> ObjectData {
        self.data
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn set_done(&mut self) {
        self.done = true;
    }

    pub fn is_fail(&self) -> bool {
        self.fail
    }

    pub fn set_fail(&mut self) {
        self.fail = true;
    }

    pub fn add_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

/// Per-call state of a set
///
/// `new_data` is what will be stored; `cur_data` is what change
/// detection compares against. Both may be rewritten by delegates.
#[derive(Clone, Debug)]
pub struct SetState {
    new_data: ObjectData,
    cur_data: ObjectData,
    done: bool,
    fail: bool,
    messages: Vec<String>,
}

impl SetState {
    pub fn new(new_data: ObjectData, cur_data: ObjectData) -> Self {
        SetState {
            new_data,
            cur_data,
            done: false,
            fail: false,
            messages: Vec::new(),
        }
    }

    pub fn new_data(&self) -> &ObjectData {
        &self.new_data
    }

    pub fn set_new_data(&mut self, data: ObjectData) {
        self.new_data = data;
    }

    pub fn cur_data(&self) -> &ObjectData {
        &self.cur_data
    }

    pub fn set_cur_data(&mut self, data: ObjectData) {
        self.cur_data = data;
    }

    /// Will committing this state fire a change notification?
    pub fn is_changed(&self) -> bool {
        self.new_data != self.cur_data
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn set_done(&mut self) {
        self.done = true;
    }

    pub fn is_fail(&self) -> bool {
        self.fail
    }

    pub fn set_fail(&mut self) {
        self.fail = true;
    }

    pub fn add_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

/// Per-call state of a change notification
#[derive(Clone, Debug)]
pub struct NotifyState {
    cur_data: ObjectData,
    old_data: ObjectData,
    messages: Vec<String>,
}

impl NotifyState {
    pub fn new(cur_data: ObjectData, old_data: ObjectData) -> Self {
        NotifyState {
            cur_data,
            old_data,
            messages: Vec::new(),
        }
    }

    pub fn cur_data(&self) -> &ObjectData {
        &self.cur_data
    }

    pub fn old_data(&self) -> &ObjectData {
        &self.old_data
    }

    pub fn add_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

/// Interceptor attached to a local object
///
/// Every hook defaults to doing nothing, so a delegate implements only
/// the intercept points it cares about. Hooks run while the object's
/// lock is held; re-entering the same object from a hook is allowed.
pub trait LocalObjectDelegate: Send + Sync {
    fn get_data(&self, _state: &mut GetState, _object: &LocalObject, _epc: Epc) {}

    fn set_data(&self, _state: &mut SetState, _object: &LocalObject, _epc: Epc) {}

    fn notify_data_changed(&self, _state: &mut NotifyState, _object: &LocalObject, _epc: Epc) {}
}

/// Delegate handle shared between an object and its owner
pub type DelegateRef = Arc<dyn LocalObjectDelegate>;

/// Identity comparison for delegate handles
#[inline]
pub fn same_delegate(a: &DelegateRef, b: &DelegateRef) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;
    impl LocalObjectDelegate for Noop {}

    #[test]
    fn test_set_state_change_detection() {
        let mut state = SetState::new(ObjectData::new(vec![1]), ObjectData::new(vec![1]));
        assert!(!state.is_changed());
        state.set_new_data(ObjectData::new(vec![2]));
        assert!(state.is_changed());
        state.set_cur_data(ObjectData::new(vec![2]));
        assert!(!state.is_changed());
    }

    #[test]
    fn test_state_flags_and_messages() {
        let mut state = GetState::new(ObjectData::default());
        assert!(!state.is_done() && !state.is_fail());
        state.set_done();
        state.set_fail();
        state.add_message("vetoed");
        assert!(state.is_done() && state.is_fail());
        assert_eq!(state.messages(), &["vetoed".to_string()]);
    }

    #[test]
    fn test_delegate_identity() {
        let a: DelegateRef = Arc::new(Noop);
        let b: DelegateRef = Arc::new(Noop);
        assert!(same_delegate(&a, &a.clone()));
        assert!(!same_delegate(&a, &b));
    }
}
