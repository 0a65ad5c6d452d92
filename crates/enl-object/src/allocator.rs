//! Instance-code allocation
//!
//! Each class owns the concrete codes 0x01..=0x7F. Allocation hands out
//! the lowest unused code; explicitly chosen codes are marked used so
//! auto-assignment never issues them again.

use std::collections::{BTreeSet, HashMap};

use parking_lot::Mutex;
use tracing::warn;

use enl_core::{ClassEoj, EnlError, EnlResult, Eoj, MAX_INSTANCE_CODE, MIN_INSTANCE_CODE};

/// Used codes of one class
#[derive(Debug, Default)]
struct ClassSlots {
    /// Highest code marked used
    highest: u8,
    used: BTreeSet<u8>,
}

impl ClassSlots {
    fn lowest_free(&self) -> Option<u8> {
        // Dense prefix: the next code follows the highest
        if self.used.len() == self.highest as usize {
            return (self.highest < MAX_INSTANCE_CODE).then_some(self.highest + 1);
        }
        (MIN_INSTANCE_CODE..=MAX_INSTANCE_CODE).find(|code| !self.used.contains(code))
    }

    fn mark(&mut self, code: u8) -> bool {
        if !self.used.insert(code) {
            return false;
        }
        self.highest = self.highest.max(code);
        true
    }
}

/// Allocator shared by every registration of one registry
#[derive(Debug, Default)]
pub struct EojAllocator {
    classes: Mutex<HashMap<ClassEoj, ClassSlots>>,
}

impl EojAllocator {
    pub fn new() -> Self {
        EojAllocator::default()
    }

    /// Allocate and mark the lowest unused code of a class
    pub fn allocate(&self, class: ClassEoj) -> EnlResult<Eoj> {
        let mut classes = self.classes.lock();
        let slots = classes.entry(class).or_default();

        let Some(code) = slots.lowest_free() else {
            warn!(%class, "instance codes exhausted");
            return Err(EnlError::CapacityExhausted { class });
        };

        slots.mark(code);
        Ok(class.instance(code))
    }

    /// Mark an explicitly chosen identifier as used
    pub fn mark_used(&self, eoj: Eoj) -> EnlResult<()> {
        if !eoj.has_valid_instance() {
            return Err(EnlError::InvalidInstanceCode(eoj.instance));
        }

        let mut classes = self.classes.lock();
        let slots = classes.entry(eoj.class_eoj()).or_default();
        if !slots.mark(eoj.instance) {
            return Err(EnlError::DuplicateObject(eoj));
        }
        Ok(())
    }

    pub fn is_used(&self, eoj: Eoj) -> bool {
        self.classes
            .lock()
            .get(&eoj.class_eoj())
            .is_some_and(|s| s.used.contains(&eoj.instance))
    }

    /// Number of codes in use for a class
    pub fn used_count(&self, class: ClassEoj) -> usize {
        self.classes.lock().get(&class).map_or(0, |s| s.used.len())
    }
}
