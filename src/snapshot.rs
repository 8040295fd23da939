//! Immutable engine snapshots for rendering layers and tests.
//!
//! A snapshot is a plain copy of the engine state keyed by item identifier.
//! Two snapshots of the same state compare equal and share a fingerprint.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::canonical::canonical_hash_hex;
use crate::types::{ItemId, Matchup};

/// Counters describing how a session has progressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Choices submitted by the user.
    pub user_choices: usize,
    /// Matchups answered from the choice cache.
    pub auto_resolutions: usize,
    /// Transitively redundant edges removed from the graph.
    pub pruned_edges: usize,
    /// Queued matchups discarded because their layers diverged.
    pub skipped_matchups: usize,
}

impl EngineStats {
    /// Total recorded choices, user and inferred.
    pub fn total_choices(&self) -> usize {
        self.user_choices + self.auto_resolutions
    }
}

/// Point-in-time copy of a ranking engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    /// Item -> layer, for scored items.
    pub scores: BTreeMap<ItemId, u32>,
    /// Layer -> items, first-listed-first within a layer.
    pub layers: BTreeMap<u32, Vec<ItemId>>,
    /// Pending matchup, if any.
    pub current_matchup: Option<Matchup>,
    /// Items not yet introduced into any matchup, in list order.
    pub unintroduced: Vec<ItemId>,
    /// Queued matchups, head first.
    pub queued: Vec<Matchup>,
    /// Scoring edges `(winner, loser)`.
    pub edges: Vec<(ItemId, ItemId)>,
    /// Every implied `(winner, loser)` pair in the choice cache.
    pub implied: Vec<(ItemId, ItemId)>,
    /// Whether the ranking is finished.
    pub complete: bool,
    /// Session counters.
    pub stats: EngineStats,
}

impl EngineSnapshot {
    /// Stable fingerprint of the snapshot contents.
    pub fn fingerprint(&self) -> String {
        canonical_hash_hex(self)
    }

    /// Number of distinct layers in use.
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty() -> EngineSnapshot {
        EngineSnapshot {
            scores: BTreeMap::new(),
            layers: BTreeMap::new(),
            current_matchup: None,
            unintroduced: vec![ItemId::from("a")],
            queued: Vec::new(),
            edges: Vec::new(),
            implied: Vec::new(),
            complete: false,
            stats: EngineStats::default(),
        }
    }

    #[test]
    fn test_fingerprint_tracks_contents() {
        let a = empty();
        let mut b = empty();
        assert_eq!(a.fingerprint(), b.fingerprint());

        b.stats.user_choices = 1;
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_layers_serialize_with_string_keys() {
        let mut snapshot = empty();
        snapshot.layers.insert(2, vec![ItemId::from("a")]);
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["layers"]["2"][0], "a");
    }
}
