//! Hashing primitives.
//!
//! Two hash families live here and they must never be swapped for one another:
//!
//! - [`digest16`] / [`domain_digest16`]: BLAKE3, truncated to 16 hex chars.
//!   Used for ledger chaining and stage output hashes.
//! - [`change_fingerprint`]: FNV-1a 64. A non-cryptographic change detector
//!   kept for compatibility with previously recorded input hashes.

use serde::Serialize;

/// Number of hex characters every obligo hash is truncated to (64 bits).
pub const HASH_HEX_LEN: usize = 16;

/// `previous_hash` of the first record in any ledger.
pub const GENESIS_HASH: &str = "0000000000000000";

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// BLAKE3 digest of `bytes`, first 16 hex chars.
pub fn digest16(bytes: &[u8]) -> String {
    truncate(blake3::hash(bytes).to_hex().as_str())
}

/// BLAKE3 digest of `domain || bytes`, first 16 hex chars.
pub fn domain_digest16(domain: &[u8], bytes: &[u8]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(domain);
    hasher.update(bytes);
    truncate(hasher.finalize().to_hex().as_str())
}

/// [`digest16`] over the JSON encoding of `value`.
///
/// Only meaningful for values whose serialization is order-stable (structs and
/// `BTreeMap`s, never `HashMap`s).
pub fn digest16_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let encoded = serde_json::to_vec(value)?;
    Ok(digest16(&encoded))
}

/// Legacy change fingerprint of a text: FNV-1a 64 over its UTF-8 bytes,
/// rendered as 16 lowercase hex chars.
///
/// Not a security hash. Identical byte sequences give identical fingerprints on
/// every platform.
pub fn change_fingerprint(text: &str) -> String {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in text.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    format!("{hash:016x}")
}

/// True if `value` has the shape of an obligo hash (16 lowercase hex chars).
pub fn is_hash16(value: &str) -> bool {
    value.len() == HASH_HEX_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

fn truncate(hex: &str) -> String {
    hex[..HASH_HEX_LEN].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_is_a_hash16() {
        assert!(is_hash16(GENESIS_HASH));
        assert!(GENESIS_HASH.bytes().all(|b| b == b'0'));
    }

    #[test]
    fn digest16_is_truncated_blake3() {
        let full = blake3::hash(b"obligo").to_hex().to_string();
        assert_eq!(digest16(b"obligo"), full[..16]);
        assert!(is_hash16(&digest16(b"")));
    }

    #[test]
    fn domain_separates_digests() {
        assert_ne!(domain_digest16(b"a:", b"payload"), digest16(b"payload"));
        assert_ne!(
            domain_digest16(b"a:", b"payload"),
            domain_digest16(b"b:", b"payload")
        );
    }

    #[test]
    fn fingerprint_matches_reference_fnv1a() {
        // FNV-1a 64 reference values.
        assert_eq!(change_fingerprint(""), "cbf29ce484222325");
        assert_eq!(change_fingerprint("a"), "af63dc4c8601ec8c");
    }

    #[test]
    fn fingerprint_and_digest_differ() {
        let text = "Users must submit identification within 30 days.";
        assert_ne!(change_fingerprint(text), digest16(text.as_bytes()));
        assert_eq!(change_fingerprint(text), change_fingerprint(text));
    }

    #[test]
    fn is_hash16_rejects_bad_shapes() {
        assert!(!is_hash16("ABCDEF0123456789"));
        assert!(!is_hash16("0123"));
        assert!(!is_hash16("g123456789abcdef"));
    }
}
