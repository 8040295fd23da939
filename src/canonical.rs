//! Canonical serialization for deterministic fingerprints.
//!
//! Used to fingerprint ranking policies and engine snapshots so two states
//! can be compared (or cached) by a short stable string.
//!
//! ## Determinism Guarantees
//!
//! - Stable field order: Struct fields serialize in declaration order
//! - Stable Vec order: Vectors serialize in index order
//! - No HashMap allowed: Use BTreeMap for maps in hashed data

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Serialize a value to canonical JSON bytes for hashing.
///
/// Values that fail to serialize (non-string map keys, failing custom
/// `Serialize` impls) hash as empty input.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_default()
}

/// Compute canonical hash of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    let bytes = to_canonical_bytes(value);
    xxh64(&bytes, 0)
}

/// Compute canonical hash and return as hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_determinism() {
        let mut layers = BTreeMap::new();
        layers.insert(1u32, vec!["a", "b"]);
        layers.insert(0u32, vec!["c"]);

        assert_eq!(canonical_hash(&layers), canonical_hash(&layers.clone()));
    }

    #[test]
    fn test_hex_width() {
        assert_eq!(canonical_hash_hex(&"anything").len(), 16);
    }

    #[test]
    fn test_order_sensitive() {
        assert_ne!(canonical_hash(&vec!["a", "b"]), canonical_hash(&vec!["b", "a"]));
    }
}
