//! Static per-class property catalogs
//!
//! An `ObjectInfo` is the ordered descriptor table of one device class.
//! Tables are immutable once built and are always completed with the
//! three capability maps, so their defaults agree with the table.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::{ClassEoj, Epc, PropertyMap};

/// Payload predicate applied to non-forced sets
pub trait Constraint: Send + Sync + fmt::Debug {
    fn is_valid(&self, data: &[u8]) -> bool;
}

/// Accepts every payload
#[derive(Clone, Copy, Debug, Default)]
pub struct AnyConstraint;

impl Constraint for AnyConstraint {
    fn is_valid(&self, _data: &[u8]) -> bool {
        true
    }
}

/// Payload length within an inclusive range
#[derive(Clone, Copy, Debug)]
pub struct SizeConstraint {
    pub min: usize,
    pub max: usize,
}

impl SizeConstraint {
    pub fn new(min: usize, max: usize) -> Self {
        SizeConstraint { min, max }
    }

    pub fn exact(size: usize) -> Self {
        SizeConstraint {
            min: size,
            max: size,
        }
    }
}

impl Constraint for SizeConstraint {
    fn is_valid(&self, data: &[u8]) -> bool {
        (self.min..=self.max).contains(&data.len())
    }
}

/// Payload must equal one of a fixed set of values
#[derive(Clone, Debug, Default)]
pub struct ValueSetConstraint {
    values: Vec<Bytes>,
}

impl ValueSetConstraint {
    pub fn new<I, B>(values: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        ValueSetConstraint {
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

impl Constraint for ValueSetConstraint {
    fn is_valid(&self, data: &[u8]) -> bool {
        self.values.iter().any(|v| v.as_ref() == data)
    }
}

/// Static metadata for one (class, property-code) pair
#[derive(Clone, Debug)]
pub struct PropertyDescriptor {
    pub epc: Epc,
    pub gettable: bool,
    pub settable: bool,
    pub observable: bool,
    pub constraint: Arc<dyn Constraint>,
    pub default: Bytes,
}

impl PropertyDescriptor {
    /// Descriptor with no access rights and an empty default
    pub fn new(epc: Epc) -> Self {
        PropertyDescriptor {
            epc,
            gettable: false,
            settable: false,
            observable: false,
            constraint: Arc::new(AnyConstraint),
            default: Bytes::new(),
        }
    }

    pub fn gettable(mut self) -> Self {
        self.gettable = true;
        self
    }

    pub fn settable(mut self) -> Self {
        self.settable = true;
        self
    }

    pub fn observable(mut self) -> Self {
        self.observable = true;
        self
    }

    pub fn constraint(mut self, constraint: impl Constraint + 'static) -> Self {
        self.constraint = Arc::new(constraint);
        self
    }

    pub fn default_value(mut self, default: impl Into<Bytes>) -> Self {
        self.default = default.into();
        self
    }

    /// Does the payload satisfy the constraint?
    #[inline]
    pub fn accepts(&self, data: &[u8]) -> bool {
        self.constraint.is_valid(data)
    }
}

/// Ordered descriptor table for one class
#[derive(Clone, Debug)]
pub struct ObjectInfo {
    class: ClassEoj,
    descriptors: Vec<PropertyDescriptor>,
    index: HashMap<Epc, usize>,
}

impl ObjectInfo {
    pub fn builder(class: ClassEoj) -> ObjectInfoBuilder {
        ObjectInfoBuilder {
            class,
            descriptors: Vec::new(),
        }
    }

    pub fn class_eoj(&self) -> ClassEoj {
        self.class
    }

    /// Descriptor for a code; unknown codes get a no-access descriptor
    pub fn descriptor(&self, epc: Epc) -> PropertyDescriptor {
        self.get(epc)
            .cloned()
            .unwrap_or_else(|| PropertyDescriptor::new(epc))
    }

    pub fn get(&self, epc: Epc) -> Option<&PropertyDescriptor> {
        self.index.get(&epc).map(|&i| &self.descriptors[i])
    }

    pub fn contains(&self, epc: Epc) -> bool {
        self.index.contains_key(&epc)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn gettable_map(&self) -> PropertyMap {
        PropertyMap::from_codes(self.iter().filter(|d| d.gettable).map(|d| d.epc))
    }

    pub fn settable_map(&self) -> PropertyMap {
        PropertyMap::from_codes(self.iter().filter(|d| d.settable).map(|d| d.epc))
    }

    pub fn observable_map(&self) -> PropertyMap {
        PropertyMap::from_codes(self.iter().filter(|d| d.observable).map(|d| d.epc))
    }
}

/// Builder that completes the table with its capability maps
pub struct ObjectInfoBuilder {
    class: ClassEoj,
    descriptors: Vec<PropertyDescriptor>,
}

impl ObjectInfoBuilder {
    /// Add a descriptor, replacing an earlier one with the same code
    pub fn add(mut self, descriptor: PropertyDescriptor) -> Self {
        self.upsert(descriptor);
        self
    }

    fn upsert(&mut self, descriptor: PropertyDescriptor) {
        match self.descriptors.iter_mut().find(|d| d.epc == descriptor.epc) {
            Some(slot) => *slot = descriptor,
            None => self.descriptors.push(descriptor),
        }
    }

    pub fn build(mut self) -> ObjectInfo {
        // Maps are gettable and list themselves
        for epc in [Epc::ANNOUNCE_MAP, Epc::SET_MAP, Epc::GET_MAP] {
            self.upsert(PropertyDescriptor::new(epc).gettable());
        }

        let mut info = ObjectInfo {
            class: self.class,
            index: HashMap::new(),
            descriptors: self.descriptors,
        };

        let maps = [
            (Epc::ANNOUNCE_MAP, info.observable_map().encode()),
            (Epc::SET_MAP, info.settable_map().encode()),
            (Epc::GET_MAP, info.gettable_map().encode()),
        ];
        for (epc, encoded) in maps {
            if let Some(d) = info.descriptors.iter_mut().find(|d| d.epc == epc) {
                d.default = Bytes::from(encoded);
            }
        }

        info.index = info
            .descriptors
            .iter()
            .enumerate()
            .map(|(i, d)| (d.epc, i))
            .collect();
        info
    }
}
