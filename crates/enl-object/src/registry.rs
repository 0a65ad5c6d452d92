//! Local object registry
//!
//! Owns every local object of a node, indexed by identifier and by
//! class. Registration allocates (or reserves) the instance code,
//! records it and indexes the object in one critical section.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use enl_core::{ClassEoj, EnlResult, Eoj};

use crate::{EojAllocator, LocalObject, LocalObjectRef};

#[derive(Default)]
struct Objects {
    /// Registration order
    list: Vec<LocalObjectRef>,
    by_eoj: HashMap<Eoj, LocalObjectRef>,
    by_class: HashMap<ClassEoj, Vec<LocalObjectRef>>,
}

/// Registry of local objects
#[derive(Default)]
pub struct LocalRegistry {
    allocator: EojAllocator,
    objects: Mutex<Objects>,
}

impl LocalRegistry {
    pub fn new() -> Self {
        LocalRegistry::default()
    }

    /// Register an object
    ///
    /// With `auto_assign` the lowest free instance code of the object's
    /// class replaces its identifier; otherwise its identifier is
    /// reserved as is.
    pub fn register(&self, object: LocalObject, auto_assign: bool) -> EnlResult<LocalObjectRef> {
        let mut objects = self.objects.lock();

        let eoj = if auto_assign {
            let eoj = self.allocator.allocate(object.class_eoj())?;
            object.set_eoj(eoj);
            eoj
        } else {
            let eoj = object.eoj();
            self.allocator.mark_used(eoj)?;
            eoj
        };

        let object = Arc::new(object);
        objects.list.push(object.clone());
        objects.by_eoj.insert(eoj, object.clone());
        objects
            .by_class
            .entry(eoj.class_eoj())
            .or_default()
            .push(object.clone());

        debug!(%eoj, auto_assign, "local object registered");
        Ok(object)
    }

    pub fn get(&self, eoj: Eoj) -> Option<LocalObjectRef> {
        self.objects.lock().by_eoj.get(&eoj).cloned()
    }

    /// Every object of a class, in registration order
    pub fn get_with_class(&self, class: ClassEoj) -> Vec<LocalObjectRef> {
        self.objects
            .lock()
            .by_class
            .get(&class)
            .cloned()
            .unwrap_or_default()
    }

    /// Objects a destination identifier addresses: every instance of the
    /// class for a wildcard, otherwise zero or one object
    pub fn resolve(&self, deoj: Eoj) -> Vec<LocalObjectRef> {
        if deoj.is_all_instance() {
            self.get_with_class(deoj.class_eoj())
        } else {
            self.get(deoj).into_iter().collect()
        }
    }

    /// Every object except profile objects
    pub fn get_device_objects(&self) -> Vec<LocalObjectRef> {
        self.objects
            .lock()
            .list
            .iter()
            .filter(|o| !o.eoj().is_profile())
            .cloned()
            .collect()
    }

    pub fn get_all(&self) -> Vec<LocalObjectRef> {
        self.objects.lock().list.clone()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.lock().list.is_empty()
    }

    pub fn allocator(&self) -> &EojAllocator {
        &self.allocator
    }
}

impl std::fmt::Debug for LocalRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalRegistry")
            .field("objects", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enl_core::{EnlError, ObjectInfo};

    const CLASS: ClassEoj = ClassEoj::new(0x01, 0x30);

    fn info(class: ClassEoj) -> ObjectInfo {
        ObjectInfo::builder(class).build()
    }

    #[test]
    fn test_auto_assign_rewrites_identifier() {
        let registry = LocalRegistry::new();
        let a = registry.register(LocalObject::unassigned(info(CLASS)), true).unwrap();
        let b = registry.register(LocalObject::unassigned(info(CLASS)), true).unwrap();
        assert_eq!(a.eoj(), CLASS.instance(1));
        assert_eq!(b.eoj(), CLASS.instance(2));
        assert!(Arc::ptr_eq(&registry.get(CLASS.instance(2)).unwrap(), &b));
    }

    #[test]
    fn test_explicit_identifier_is_reserved() {
        let registry = LocalRegistry::new();
        registry
            .register(LocalObject::new(CLASS.instance(1), info(CLASS)), false)
            .unwrap();
        let auto = registry.register(LocalObject::unassigned(info(CLASS)), true).unwrap();
        assert_eq!(auto.eoj(), CLASS.instance(2));

        let dup = registry.register(LocalObject::new(CLASS.instance(1), info(CLASS)), false);
        assert_eq!(dup.unwrap_err(), EnlError::DuplicateObject(CLASS.instance(1)));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_resolve_wildcard_and_concrete() {
        let registry = LocalRegistry::new();
        for _ in 0..3 {
            registry.register(LocalObject::unassigned(info(CLASS)), true).unwrap();
        }

        assert_eq!(registry.resolve(CLASS.all_instances()).len(), 3);
        assert_eq!(registry.resolve(CLASS.instance(2)).len(), 1);
        assert!(registry.resolve(CLASS.instance(9)).is_empty());
        assert!(registry.resolve(ClassEoj::new(0x02, 0x90).all_instances()).is_empty());
    }

    #[test]
    fn test_device_objects_exclude_profiles() {
        let registry = LocalRegistry::new();
        registry
            .register(LocalObject::new(Eoj::NODE_PROFILE, info(ClassEoj::NODE_PROFILE)), false)
            .unwrap();
        registry.register(LocalObject::unassigned(info(CLASS)), true).unwrap();

        let devices = registry.get_device_objects();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].eoj(), CLASS.instance(1));
        assert_eq!(registry.get_all().len(), 2);
    }

    #[test]
    fn test_capacity_exhaustion_surfaces() {
        let registry = LocalRegistry::new();
        for _ in 0..127 {
            registry.register(LocalObject::unassigned(info(CLASS)), true).unwrap();
        }
        let err = registry.register(LocalObject::unassigned(info(CLASS)), true);
        assert_eq!(err.unwrap_err(), EnlError::CapacityExhausted { class: CLASS });
        assert_eq!(registry.len(), 127);
    }
}
