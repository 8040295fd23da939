//! Error types for the ranking engine.

use crate::types::ItemId;

/// Error type for ranking engine operations.
///
/// Usage errors mean the caller violated a precondition; the call must be
/// corrected, not retried as-is. `InvariantViolation` is an internal logic
/// bug and the session it came from must be discarded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RankerError {
    /// `initialize` was called with nothing to rank.
    #[error("Cannot initialize ranking: item pool is empty")]
    EmptyPool,
    /// No matchup is pending (not initialized, or already complete).
    #[error("No matchup is pending")]
    NoMatchup,
    /// The submitted pair does not match the pending matchup.
    #[error("Choice {winner} over {loser} does not match the pending matchup")]
    InvalidChoice {
        /// Submitted winner.
        winner: ItemId,
        /// Submitted loser.
        loser: ItemId,
    },
    /// An identifier has no node in the preference graph.
    #[error("Unknown item: {0}")]
    UnknownNode(ItemId),
    /// The initial item list contained the same identifier twice.
    #[error("Duplicate item in pool: {0}")]
    DuplicateItem(ItemId),
    /// Internal consistency violation (should never happen).
    #[error("Internal invariant violated: {0}")]
    InvariantViolation(String),
}

impl RankerError {
    /// Whether this error was caused by the caller rather than the engine.
    pub fn is_usage_error(&self) -> bool {
        !matches!(self, Self::InvariantViolation(_))
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyPool => "EMPTY_POOL",
            Self::NoMatchup => "NO_MATCHUP",
            Self::InvalidChoice { .. } => "INVALID_CHOICE",
            Self::UnknownNode(_) => "UNKNOWN_NODE",
            Self::DuplicateItem(_) => "DUPLICATE_ITEM",
            Self::InvariantViolation(_) => "INVARIANT_VIOLATION",
        }
    }

    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }
}
