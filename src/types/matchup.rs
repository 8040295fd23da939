//! Matchup and choice types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

use super::item::ItemId;

/// An unordered pair of items presented for comparison.
///
/// `{A, B}` and `{B, A}` are the same matchup: equality ignores orientation.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct Matchup {
    /// Item shown first.
    pub first: ItemId,
    /// Item shown second.
    pub second: ItemId,
}

impl Matchup {
    /// Create a new matchup.
    pub fn new(first: impl Into<ItemId>, second: impl Into<ItemId>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }

    /// Check whether the matchup contains an item.
    pub fn contains(&self, id: &ItemId) -> bool {
        &self.first == id || &self.second == id
    }

    /// Check whether the matchup is exactly the pair `{a, b}`, in either orientation.
    pub fn is_pair(&self, a: &ItemId, b: &ItemId) -> bool {
        (&self.first == a && &self.second == b) || (&self.first == b && &self.second == a)
    }

    /// Get the opponent of `id` in this matchup.
    pub fn opponent(&self, id: &ItemId) -> Option<&ItemId> {
        if &self.first == id {
            Some(&self.second)
        } else if &self.second == id {
            Some(&self.first)
        } else {
            None
        }
    }

    /// Both members as a tuple, in presentation order.
    pub fn as_tuple(&self) -> (&ItemId, &ItemId) {
        (&self.first, &self.second)
    }
}

impl PartialEq for Matchup {
    fn eq(&self, other: &Self) -> bool {
        self.is_pair(&other.first, &other.second)
    }
}

// Hash the members in sorted order so it agrees with the unordered `Eq`.
impl Hash for Matchup {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let (lo, hi) = if self.first <= self.second {
            (&self.first, &self.second)
        } else {
            (&self.second, &self.first)
        };
        lo.hash(state);
        hi.hash(state);
    }
}

impl fmt::Display for Matchup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} vs {}", self.first, self.second)
    }
}

/// A recorded "winner beats loser" judgment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Choice {
    /// Item chosen by the user.
    pub winner: ItemId,
    /// Item passed over.
    pub loser: ItemId,
}

impl Choice {
    /// Create a new choice.
    pub fn new(winner: impl Into<ItemId>, loser: impl Into<ItemId>) -> Self {
        Self {
            winner: winner.into(),
            loser: loser.into(),
        }
    }
}

/// How a recorded choice was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Answered by the user.
    User,
    /// Answered from the choice cache without asking.
    Inferred,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Inferred => write!(f, "inferred"),
        }
    }
}

/// A choice together with how it was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedChoice {
    /// The judgment.
    #[serde(flatten)]
    pub choice: Choice,
    /// Who answered it.
    pub resolution: Resolution,
}
