//! Item identifier for the ranking engine.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Opaque identifier for an item being ranked (e.g. a track ID).
///
/// The engine never inspects item content; it only compares identifiers.
/// Implements `Ord` so collections keyed by it iterate deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Create a new ItemId.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the identifier, returning the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ItemId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_item_id_ordering() {
        let a = ItemId::from("a");
        let b = ItemId::from("b");
        assert!(a < b);
    }

    #[test]
    fn test_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(ItemId::from("track-1"), 7);
        assert_eq!(map.get("track-1"), Some(&7));
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_string(&ItemId::from("4uLU6hMCjMI75M1A2tKUQC")).unwrap();
        assert_eq!(json, "\"4uLU6hMCjMI75M1A2tKUQC\"");
    }
}
