//! Opponent selection for newly introduced items.
//!
//! Median targeting is a heuristic: pairing a fresh item against the middle
//! of the current order bisects it, which tends to place the item with few
//! questions. It is not a comparison-optimal insertion sort.

use std::collections::BTreeSet;

use super::ranker::PairingStrategy;
use crate::graph::{LayerScores, NodeIx};

/// Pick an opponent for `candidate`, an item that has not been scored yet.
///
/// With scored items present, `MedianTarget` returns the scored item whose
/// layer is closest to the median layer (lowest index on ties). With nothing
/// scored yet, any other unintroduced item from `pool` is used. Returns
/// `None` when no opponent exists.
pub fn find_best_match(
    candidate: NodeIx,
    pool: &BTreeSet<NodeIx>,
    scores: &LayerScores,
    strategy: PairingStrategy,
) -> Option<NodeIx> {
    let next_unintroduced = || pool.iter().copied().find(|&ix| ix != candidate);

    match strategy {
        PairingStrategy::Sequential => next_unintroduced().or_else(|| closest_to_median(candidate, scores)),
        PairingStrategy::MedianTarget => closest_to_median(candidate, scores).or_else(next_unintroduced),
    }
}

fn closest_to_median(candidate: NodeIx, scores: &LayerScores) -> Option<NodeIx> {
    let median = scores.median()?;
    scores
        .scores()
        .iter()
        .filter(|&(&ix, _)| ix != candidate)
        .min_by_key(|&(&ix, &layer)| (layer.abs_diff(median), ix))
        .map(|(&ix, _)| ix)
}
