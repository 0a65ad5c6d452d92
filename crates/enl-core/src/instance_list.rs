//! Node-profile instance list codec
//!
//! Layout: `[count, (group, class, instance)*]`, at most 84 entries.

use crate::{EnlError, EnlResult, Eoj};

/// Maximum identifiers carried by one list
pub const MAX_INSTANCE_LIST_ENTRIES: usize = 84;

/// Encode an instance list, truncating past the maximum entry count
pub fn encode_instance_list(eojs: &[Eoj]) -> Vec<u8> {
    let count = eojs.len().min(MAX_INSTANCE_LIST_ENTRIES);
    let mut buf = Vec::with_capacity(1 + count * 3);
    buf.push(count as u8);
    for eoj in &eojs[..count] {
        buf.extend_from_slice(&eoj.to_bytes());
    }
    buf
}

/// Decode an instance list
pub fn decode_instance_list(buf: &[u8]) -> EnlResult<Vec<Eoj>> {
    let Some((&count, rest)) = buf.split_first() else {
        return Err(EnlError::InvalidInstanceList("empty payload".into()));
    };
    let count = count as usize;

    if count > MAX_INSTANCE_LIST_ENTRIES {
        return Err(EnlError::InvalidInstanceList(format!(
            "{} entries exceeds {}",
            count, MAX_INSTANCE_LIST_ENTRIES
        )));
    }
    if rest.len() != count * 3 {
        return Err(EnlError::InvalidInstanceList(format!(
            "expected {} bytes, got {}",
            count * 3,
            rest.len()
        )));
    }

    Ok(rest
        .chunks_exact(3)
        .map(|c| Eoj::new(c[0], c[1], c[2]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_list_roundtrip() {
        let eojs = vec![Eoj::new(0x01, 0x30, 0x01), Eoj::new(0x02, 0x90, 0x02)];
        let bytes = encode_instance_list(&eojs);
        assert_eq!(bytes, vec![2, 0x01, 0x30, 0x01, 0x02, 0x90, 0x02]);
        assert_eq!(decode_instance_list(&bytes).unwrap(), eojs);
    }

    #[test]
    fn test_instance_list_truncates() {
        let eojs: Vec<Eoj> = (0..100).map(|i| Eoj::new(0x01, 0x30, i as u8)).collect();
        let bytes = encode_instance_list(&eojs);
        assert_eq!(bytes[0] as usize, MAX_INSTANCE_LIST_ENTRIES);
        assert_eq!(bytes.len(), 1 + MAX_INSTANCE_LIST_ENTRIES * 3);
    }

    #[test]
    fn test_instance_list_rejects_short_payload() {
        assert!(decode_instance_list(&[]).is_err());
        assert!(decode_instance_list(&[1, 0x01, 0x30]).is_err());
    }
}
