//! Property code and payload pair carried in frames

use bytes::Bytes;

use crate::Epc;

/// One entry of a frame's property list
///
/// An empty payload means "request only" in requests and "accepted" in
/// set replies.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Property {
    pub epc: Epc,
    pub edt: Bytes,
}

impl Property {
    pub fn new(epc: Epc, edt: impl Into<Bytes>) -> Self {
        Property {
            epc,
            edt: edt.into(),
        }
    }

    /// Property with an empty payload
    pub fn request(epc: Epc) -> Self {
        Property {
            epc,
            edt: Bytes::new(),
        }
    }

    /// Payload length (PDC)
    #[inline]
    pub fn pdc(&self) -> usize {
        self.edt.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.edt.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_has_no_payload() {
        let p = Property::request(Epc(0x80));
        assert!(p.is_empty());
        assert_eq!(p.pdc(), 0);
    }

    #[test]
    fn test_payload_length() {
        let p = Property::new(Epc(0xE0), vec![0x12, 0x34]);
        assert_eq!(p.pdc(), 2);
        assert_eq!(&p.edt[..], &[0x12, 0x34]);
    }
}
