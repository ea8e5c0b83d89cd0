//! Tagged-key encoding.
//!
//! Storage consumers key records by a 2-byte big-endian type tag followed
//! by the raw UTF-8 bytes of the key. No escaping is applied; decoding
//! simply drops the tag.

use schemapack_core::PackError;

/// Encode a storage key for a type tag.
///
/// The key format is: `[tag as big-endian u16][key bytes]`
#[must_use]
pub fn encode_key(tag: u16, key: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(2 + key.len());
    buf.extend_from_slice(&tag.to_be_bytes());
    buf.extend_from_slice(key.as_bytes());
    buf
}

/// The 2-byte big-endian form of a tag alone, usable as a scan prefix.
#[inline]
#[must_use]
pub fn encode_tag(tag: u16) -> [u8; 2] {
    tag.to_be_bytes()
}

/// Recover the key from an encoded tagged key.
pub fn decode_key(encoded: &[u8]) -> Result<&str, PackError> {
    let rest = encoded.get(2..).ok_or(PackError::UnexpectedEof)?;
    std::str::from_utf8(rest)
        .map_err(|e| PackError::Encoding(format!("invalid UTF-8 in key: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn key_layout_is_tag_then_bytes() {
        assert_eq!(encode_key(2, "one"), vec![0x00, 0x02, 0x6F, 0x6E, 0x65]);
        assert_eq!(encode_key(0x0102, ""), vec![0x01, 0x02]);
    }

    #[test]
    fn keys_roundtrip() {
        for key in ["", "one", "世界您好"] {
            let encoded = encode_key(7, key);
            assert_eq!(decode_key(&encoded).unwrap(), key);
        }
    }

    #[test]
    fn tag_prefix_matches_key_prefix() {
        let tag = encode_tag(300);
        let key = encode_key(300, "abc");
        assert!(key.starts_with(&tag));
    }

    #[test]
    fn short_input_fails_decode() {
        assert!(decode_key(&[0x01]).is_err());
    }

    #[test]
    fn keys_group_by_tag_in_sorted_storage() {
        let a1 = encode_key(1, "zzz");
        let b1 = encode_key(2, "aaa");
        assert!(a1 < b1, "lower tags sort first regardless of key bytes");
    }
}
