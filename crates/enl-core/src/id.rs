//! Identity types for the object-access layer
//!
//! Every controllable device is an object addressed by a class-group,
//! class and instance code (EOJ). Instance code 0x00 addresses every
//! instance of a class.

use std::fmt;

/// Node identity - opaque handle for a remote or local node
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl NodeId {
    pub const ZERO: NodeId = NodeId(0);

    #[inline]
    pub fn new(id: u64) -> Self {
        NodeId(id)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({:016x})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Class group reserved for profile objects
pub const PROFILE_CLASS_GROUP: u8 = 0x0E;

/// Instance code addressing every instance of a class
pub const WILDCARD_INSTANCE: u8 = 0x00;

/// Lowest concrete instance code
pub const MIN_INSTANCE_CODE: u8 = 0x01;

/// Highest concrete instance code
pub const MAX_INSTANCE_CODE: u8 = 0x7F;

/// Class identity - class group and class code
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ClassEoj {
    pub group: u8,
    pub class: u8,
}

impl ClassEoj {
    /// Node profile class (0x0E 0xF0)
    pub const NODE_PROFILE: ClassEoj = ClassEoj {
        group: PROFILE_CLASS_GROUP,
        class: 0xF0,
    };

    #[inline]
    pub const fn new(group: u8, class: u8) -> Self {
        ClassEoj { group, class }
    }

    /// Build a concrete identifier of this class
    #[inline]
    pub fn instance(self, code: u8) -> Eoj {
        Eoj::new(self.group, self.class, code)
    }

    /// Identifier addressing every instance of this class
    #[inline]
    pub fn all_instances(self) -> Eoj {
        self.instance(WILDCARD_INSTANCE)
    }

    #[inline]
    pub fn is_profile(self) -> bool {
        self.group == PROFILE_CLASS_GROUP
    }

    #[inline]
    pub fn to_bytes(self) -> [u8; 2] {
        [self.group, self.class]
    }
}

impl fmt::Debug for ClassEoj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Class({:02x}{:02x})", self.group, self.class)
    }
}

impl fmt::Display for ClassEoj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}{:02x}", self.group, self.class)
    }
}

/// Object identity - class plus instance code
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Eoj {
    pub class: ClassEoj,
    pub instance: u8,
}

impl Eoj {
    /// The local node profile object (0x0EF001)
    pub const NODE_PROFILE: Eoj = Eoj {
        class: ClassEoj::NODE_PROFILE,
        instance: 0x01,
    };

    #[inline]
    pub const fn new(group: u8, class: u8, instance: u8) -> Self {
        Eoj {
            class: ClassEoj { group, class },
            instance,
        }
    }

    #[inline]
    pub fn class_eoj(self) -> ClassEoj {
        self.class
    }

    /// Does this identifier address every instance of its class?
    #[inline]
    pub fn is_all_instance(self) -> bool {
        self.instance == WILDCARD_INSTANCE
    }

    /// Is the instance code usable by a concrete object?
    #[inline]
    pub fn has_valid_instance(self) -> bool {
        (MIN_INSTANCE_CODE..=MAX_INSTANCE_CODE).contains(&self.instance)
    }

    #[inline]
    pub fn is_profile(self) -> bool {
        self.class.is_profile()
    }

    /// Same identifier with a different instance code
    #[inline]
    pub fn with_instance(self, instance: u8) -> Self {
        Eoj {
            class: self.class,
            instance,
        }
    }

    #[inline]
    pub fn to_bytes(self) -> [u8; 3] {
        [self.class.group, self.class.class, self.instance]
    }

    #[inline]
    pub fn from_bytes(bytes: [u8; 3]) -> Self {
        Eoj::new(bytes[0], bytes[1], bytes[2])
    }
}

impl fmt::Debug for Eoj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Eoj({:02x}{:02x}{:02x})",
            self.class.group, self.class.class, self.instance
        )
    }
}

impl fmt::Display for Eoj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}{:02x}{:02x}",
            self.class.group, self.class.class, self.instance
        )
    }
}

/// Property code - one property slot within a device class
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Epc(pub u8);

impl Epc {
    /// Observable (announce) property map
    pub const ANNOUNCE_MAP: Epc = Epc(0x9D);
    /// Settable property map
    pub const SET_MAP: Epc = Epc(0x9E);
    /// Gettable property map
    pub const GET_MAP: Epc = Epc(0x9F);
    /// Node profile: number of self-node instances
    pub const SELF_NODE_INSTANCE_COUNT: Epc = Epc(0xD3);
    /// Node profile: instance list notification
    pub const INSTANCE_LIST_NOTIFICATION: Epc = Epc(0xD5);
    /// Node profile: self-node instance list S
    pub const SELF_NODE_INSTANCE_LIST: Epc = Epc(0xD6);

    #[inline]
    pub fn to_byte(self) -> u8 {
        self.0
    }
}

impl fmt::Debug for Epc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Epc({:02x})", self.0)
    }
}

impl fmt::Display for Epc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}", self.0)
    }
}

/// Transaction identity - matches replies to requests
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Tid(pub u16);

impl Tid {
    #[inline]
    pub fn next(self) -> Self {
        Tid(self.0.wrapping_add(1))
    }
}

impl fmt::Debug for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tid({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eoj_bytes_roundtrip() {
        let eoj = Eoj::new(0x01, 0x30, 0x02);
        assert_eq!(Eoj::from_bytes(eoj.to_bytes()), eoj);
        assert_eq!(eoj.class_eoj(), ClassEoj::new(0x01, 0x30));
    }

    #[test]
    fn test_instance_ranges() {
        let class = ClassEoj::new(0x01, 0x30);
        assert!(class.all_instances().is_all_instance());
        assert!(!class.all_instances().has_valid_instance());
        assert!(class.instance(0x01).has_valid_instance());
        assert!(class.instance(0x7F).has_valid_instance());
        assert!(!class.instance(0x80).has_valid_instance());
    }

    #[test]
    fn test_profile_classification() {
        assert!(Eoj::NODE_PROFILE.is_profile());
        assert!(!Eoj::new(0x01, 0x30, 0x01).is_profile());
    }

    #[test]
    fn test_display_formats() {
        assert_eq!(Eoj::new(0x0E, 0xF0, 0x01).to_string(), "0ef001");
        assert_eq!(format!("{:?}", Epc(0x80)), "Epc(80)");
    }

    #[test]
    fn test_tid_wraps() {
        assert_eq!(Tid(u16::MAX).next(), Tid(0));
    }
}
