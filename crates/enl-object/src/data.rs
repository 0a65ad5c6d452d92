//! Stored property values

use bytes::Bytes;

/// Value held for one property
///
/// `data` is the current value. `extra` is an ordered history of
/// buffered values that announce-mode reads expand into repeated
/// entries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectData {
    data: Bytes,
    extra: Vec<Bytes>,
}

impl ObjectData {
    pub fn new(data: impl Into<Bytes>) -> Self {
        ObjectData {
            data: data.into(),
            extra: Vec::new(),
        }
    }

    pub fn with_extra(data: impl Into<Bytes>, extra: Vec<Bytes>) -> Self {
        ObjectData {
            data: data.into(),
            extra,
        }
    }

    /// Build from a list: the first entry is the value, the rest history
    pub fn from_list(mut list: Vec<Bytes>) -> Option<Self> {
        if list.is_empty() {
            return None;
        }
        let data = list.remove(0);
        Some(ObjectData { data, extra: list })
    }

    #[inline]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    #[inline]
    pub fn extra(&self) -> &[Bytes] {
        &self.extra
    }

    #[inline]
    pub fn extra_size(&self) -> usize {
        self.extra.len()
    }

    pub fn push_extra(&mut self, value: impl Into<Bytes>) {
        self.extra.push(value.into());
    }

    pub fn clear_extra(&mut self) {
        self.extra.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Value followed by history
    pub fn iter(&self) -> impl Iterator<Item = &Bytes> {
        std::iter::once(&self.data).chain(self.extra.iter())
    }
}

impl From<Bytes> for ObjectData {
    fn from(data: Bytes) -> Self {
        ObjectData::new(data)
    }
}

impl From<Vec<u8>> for ObjectData {
    fn from(data: Vec<u8>) -> Self {
        ObjectData::new(data)
    }
}

impl From<&[u8]> for ObjectData {
    fn from(data: &[u8]) -> Self {
        ObjectData::new(Bytes::copy_from_slice(data))
    }
}
