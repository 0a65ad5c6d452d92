//! Capability bitmap codec
//!
//! Three fixed properties (0x9D, 0x9E, 0x9F) list the codes that are
//! observable, settable and gettable. With fewer than 16 codes the list
//! is stored verbatim; otherwise as a 16-byte bitmap where code `c` is
//! bit `(c >> 4) - 8` of byte `c & 0x0F`.

use std::collections::BTreeSet;

use crate::{EnlError, EnlResult, Epc};

/// Codes at or above this threshold switch to the bitmap form
const LIST_FORM_LIMIT: usize = 16;

/// Bitmap form size (count byte excluded)
const BITMAP_SIZE: usize = 16;

/// Decoded capability map
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PropertyMap {
    codes: BTreeSet<Epc>,
}

impl PropertyMap {
    pub fn new() -> Self {
        PropertyMap::default()
    }

    pub fn from_codes(codes: impl IntoIterator<Item = Epc>) -> Self {
        PropertyMap {
            codes: codes.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, epc: Epc) {
        self.codes.insert(epc);
    }

    pub fn contains(&self, epc: Epc) -> bool {
        self.codes.contains(&epc)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Epc> + '_ {
        self.codes.iter().copied()
    }

    /// Encode to the wire form
    ///
    /// Codes below 0x80 have no bitmap position. Once the map is large
    /// enough for the bitmap form they are left out, and if too few codes
    /// remain for a bitmap the rest go out in list form.
    pub fn encode(&self) -> Vec<u8> {
        let codes: Vec<Epc> = if self.codes.len() < LIST_FORM_LIMIT {
            self.codes.iter().copied().collect()
        } else {
            self.codes.iter().copied().filter(|e| e.0 >= 0x80).collect()
        };
        let count = codes.len().min(u8::MAX as usize);

        if count < LIST_FORM_LIMIT {
            let mut buf = Vec::with_capacity(1 + count);
            buf.push(count as u8);
            buf.extend(codes.iter().map(|e| e.0));
            return buf;
        }

        let mut buf = vec![0u8; 1 + BITMAP_SIZE];
        buf[0] = count as u8;
        for epc in &codes {
            let index = (epc.0 & 0x0F) as usize;
            let bit = (epc.0 >> 4) - 8;
            buf[1 + index] |= 1 << bit;
        }
        buf
    }

    /// Decode from the wire form
    pub fn decode(buf: &[u8]) -> EnlResult<Self> {
        let Some((&count, rest)) = buf.split_first() else {
            return Err(EnlError::InvalidPropertyMap("empty payload".into()));
        };
        let count = count as usize;

        if count < LIST_FORM_LIMIT {
            if rest.len() != count {
                return Err(EnlError::InvalidPropertyMap(format!(
                    "list form expects {} codes, got {}",
                    count,
                    rest.len()
                )));
            }
            return Ok(PropertyMap::from_codes(rest.iter().map(|&b| Epc(b))));
        }

        if rest.len() != BITMAP_SIZE {
            return Err(EnlError::InvalidPropertyMap(format!(
                "bitmap form expects {} bytes, got {}",
                BITMAP_SIZE,
                rest.len()
            )));
        }

        let mut map = PropertyMap::new();
        for (index, byte) in rest.iter().enumerate() {
            for bit in 0..8u8 {
                if byte & (1 << bit) != 0 {
                    map.insert(Epc(((bit + 8) << 4) | index as u8));
                }
            }
        }

        if map.len() != count {
            return Err(EnlError::InvalidPropertyMap(format!(
                "count {} does not match {} set bits",
                count,
                map.len()
            )));
        }

        Ok(map)
    }
}
