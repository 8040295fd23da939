//! Ranker policy: tunable behavior of a ranking session.

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_hash_hex;
use crate::DEFAULT_POLICY_VERSION;

/// How a newly introduced item picks its first opponent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingStrategy {
    /// Pair against the scored item closest to the median layer.
    #[default]
    MedianTarget,
    /// Pair against the next unintroduced item; once the pool is empty,
    /// fall back to median targeting.
    Sequential,
}

impl PairingStrategy {
    /// Parse a strategy from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "median_target" | "median" => Some(Self::MedianTarget),
            "sequential" => Some(Self::Sequential),
            _ => None,
        }
    }
}

impl std::fmt::Display for PairingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MedianTarget => write!(f, "median_target"),
            Self::Sequential => write!(f, "sequential"),
        }
    }
}

/// Ranker policy.
///
/// ## Parameters
///
/// - `pairing`: opponent selection for newly introduced items
/// - `prune_redundant_edges`: drop edges spanning more than one layer after
///   each choice, keeping the graph a covering relation
/// - `max_auto_resolutions`: cap on cache-answered matchups within a single
///   `make_choice`; `None` derives the cap from the item count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankerPolicy {
    /// Policy version identifier.
    pub version: String,
    /// Opponent selection strategy.
    pub pairing: PairingStrategy,
    /// Whether to prune transitively redundant edges.
    pub prune_redundant_edges: bool,
    /// Upper bound on auto-resolutions per call.
    pub max_auto_resolutions: Option<usize>,
}

impl Default for RankerPolicy {
    fn default() -> Self {
        Self {
            version: DEFAULT_POLICY_VERSION.to_string(),
            pairing: PairingStrategy::MedianTarget,
            prune_redundant_edges: true,
            max_auto_resolutions: None,
        }
    }
}

impl RankerPolicy {
    /// Policy with sequential pairing.
    pub fn sequential() -> Self {
        Self {
            pairing: PairingStrategy::Sequential,
            ..Self::default()
        }
    }

    /// Policy type identifier.
    pub fn policy_id(&self) -> &str {
        &self.version
    }

    /// Stable hash of the policy parameters.
    pub fn params_hash(&self) -> String {
        canonical_hash_hex(self)
    }

    /// Auto-resolution cap for a pool of `num_items`.
    ///
    /// Every auto-resolution raises the winner's layer, so the sum of layers
    /// (at most `n * (n - 1)`) bounds the chain.
    pub fn auto_resolution_limit(&self, num_items: usize) -> usize {
        self.max_auto_resolutions
            .unwrap_or_else(|| num_items.saturating_mul(num_items).max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_hash_stable() {
        let a = RankerPolicy::default();
        let b = RankerPolicy::default();
        assert_eq!(a.params_hash(), b.params_hash());
        assert_ne!(a.params_hash(), RankerPolicy::sequential().params_hash());
    }

    #[test]
    fn test_policy_json_roundtrip_keeps_hash() {
        let policy = RankerPolicy::sequential();
        let json = serde_json::to_string(&policy).unwrap();
        let parsed: RankerPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.params_hash(), policy.params_hash());
        assert!(json.contains("\"sequential\""));
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!(PairingStrategy::from_str("Median"), Some(PairingStrategy::MedianTarget));
        assert_eq!(PairingStrategy::from_str("sequential"), Some(PairingStrategy::Sequential));
        assert_eq!(PairingStrategy::from_str("random"), None);
    }

    #[test]
    fn test_auto_resolution_limit() {
        let mut policy = RankerPolicy::default();
        assert_eq!(policy.auto_resolution_limit(10), 100);
        policy.max_auto_resolutions = Some(3);
        assert_eq!(policy.auto_resolution_limit(10), 3);
    }
}
