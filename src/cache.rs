//! Choice cache: transitive closure of every recorded "beats" judgment.
//!
//! `beats(a, b)` holds iff a chain of recorded choices `a > x > ... > b`
//! exists. The engine consults it before surfacing a matchup so the user is
//! never asked a question whose answer is already implied.
//!
//! Unlike the graph's edge set, the cache is never pruned.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::graph::NodeIx;

/// Winner -> every node known to lose to it, directly or transitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChoiceCache {
    wins: BTreeMap<NodeIx, BTreeSet<NodeIx>>,
}

impl ChoiceCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `winner` beating `loser` and propagate the closure.
    ///
    /// Everything the loser already beats is collected breadth-first and
    /// added to the winner's entry; every node that already beat the winner
    /// inherits the same set. Returns the number of newly implied pairs.
    pub fn record(&mut self, winner: NodeIx, loser: NodeIx) -> usize {
        let mut defeated: BTreeSet<NodeIx> = BTreeSet::new();
        let mut queue = VecDeque::from([loser]);
        while let Some(ix) = queue.pop_front() {
            if ix == winner || !defeated.insert(ix) {
                continue;
            }
            if let Some(next) = self.wins.get(&ix) {
                queue.extend(next.iter().copied());
            }
        }

        let mut added = 0;
        let entry = self.wins.entry(winner).or_default();
        for &ix in &defeated {
            if entry.insert(ix) {
                added += 1;
            }
        }

        let beaters: Vec<NodeIx> = self
            .wins
            .iter()
            .filter(|&(&ix, losers)| ix != winner && losers.contains(&winner))
            .map(|(&ix, _)| ix)
            .collect();
        for beater in beaters {
            let entry = self.wins.entry(beater).or_default();
            for &ix in &defeated {
                if ix != beater && entry.insert(ix) {
                    added += 1;
                }
            }
        }

        added
    }

    /// Check whether `a` is known to beat `b`.
    pub fn beats(&self, a: NodeIx, b: NodeIx) -> bool {
        self.wins.get(&a).is_some_and(|losers| losers.contains(&b))
    }

    /// Known outcome of the pair `{a, b}` as `(winner, loser)`, if any.
    pub fn verdict(&self, a: NodeIx, b: NodeIx) -> Option<(NodeIx, NodeIx)> {
        if self.beats(a, b) {
            Some((a, b))
        } else if self.beats(b, a) {
            Some((b, a))
        } else {
            None
        }
    }

    /// Every node known to lose to `winner`.
    pub fn losers_of(&self, winner: NodeIx) -> Option<&BTreeSet<NodeIx>> {
        self.wins.get(&winner)
    }

    /// Total number of implied `(winner, loser)` pairs.
    pub fn num_pairs(&self) -> usize {
        self.wins.values().map(BTreeSet::len).sum()
    }

    /// Iterate over all implied pairs, winners in ascending index order.
    pub fn pairs(&self) -> impl Iterator<Item = (NodeIx, NodeIx)> + '_ {
        self.wins
            .iter()
            .flat_map(|(&w, losers)| losers.iter().map(move |&l| (w, l)))
    }
}
