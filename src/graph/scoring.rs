//! Layer scoring for the preference graph.
//!
//! A node's layer is the length of the longest directed path from it down to
//! a sink:
//!
//! ```text
//! layer(n) = 0                               if n beats nothing
//! layer(n) = 1 + max(layer(c) for c in below) otherwise
//! ```
//!
//! Higher layer = ranked better. Only nodes that have taken part in at least
//! one recorded choice are scored; everything else is "unscored".
//!
//! Scores are always rebuilt from scratch. There is no incremental update.

use std::collections::{BTreeMap, HashSet};

use super::{NodeIx, PreferenceGraph};
use crate::error::RankerError;

/// Score map and reverse score map for one graph state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerScores {
    /// Node -> layer.
    scores: BTreeMap<NodeIx, u32>,
    /// Layer -> nodes, each bucket in arena (first-listed-first) order.
    layers: BTreeMap<u32, Vec<NodeIx>>,
}

impl LayerScores {
    /// Compute layer scores with a memoized depth-first pass.
    ///
    /// The traversal uses an explicit stack so deep chains cannot overflow
    /// the call stack. A cycle in the graph is reported as an
    /// `InvariantViolation`.
    pub fn compute(graph: &PreferenceGraph) -> Result<Self, RankerError> {
        let mut scores: BTreeMap<NodeIx, u32> = BTreeMap::new();
        let mut on_path: HashSet<NodeIx> = HashSet::new();

        for root in graph.nodes().filter(|n| n.has_edges()).map(|n| n.ix()) {
            if scores.contains_key(&root) {
                continue;
            }

            // (node, children_done)
            let mut stack: Vec<(NodeIx, bool)> = vec![(root, false)];
            while let Some((ix, children_done)) = stack.pop() {
                if children_done {
                    let mut layer = 0;
                    for child in graph.node(ix).below() {
                        let child_layer = scores.get(child).ok_or_else(|| {
                            RankerError::invariant(format!(
                                "child {} of {} left unscored",
                                graph.id(*child),
                                graph.id(ix)
                            ))
                        })?;
                        layer = layer.max(child_layer + 1);
                    }
                    scores.insert(ix, layer);
                    on_path.remove(&ix);
                    continue;
                }

                if scores.contains_key(&ix) {
                    continue;
                }
                if !on_path.insert(ix) {
                    return Err(RankerError::invariant(format!(
                        "preference cycle through {}",
                        graph.id(ix)
                    )));
                }

                stack.push((ix, true));
                for &child in graph.node(ix).below() {
                    if on_path.contains(&child) {
                        return Err(RankerError::invariant(format!(
                            "preference cycle through {}",
                            graph.id(child)
                        )));
                    }
                    if !scores.contains_key(&child) {
                        stack.push((child, false));
                    }
                }
            }
        }

        let mut layers: BTreeMap<u32, Vec<NodeIx>> = BTreeMap::new();
        for (&ix, &layer) in &scores {
            layers.entry(layer).or_default().push(ix);
        }

        Ok(Self { scores, layers })
    }

    /// Layer of a node, if scored.
    pub fn get(&self, ix: NodeIx) -> Option<u32> {
        self.scores.get(&ix).copied()
    }

    /// Check whether a node is scored.
    pub fn is_scored(&self, ix: NodeIx) -> bool {
        self.scores.contains_key(&ix)
    }

    /// Number of scored nodes.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Check whether nothing is scored yet.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// The score map.
    pub fn scores(&self) -> &BTreeMap<NodeIx, u32> {
        &self.scores
    }

    /// The reverse score map (layer -> members).
    pub fn layers(&self) -> &BTreeMap<u32, Vec<NodeIx>> {
        &self.layers
    }

    /// Layers holding two or more nodes, lowest layer first.
    pub fn tie_groups(&self) -> impl Iterator<Item = (u32, &[NodeIx])> {
        self.layers
            .iter()
            .filter(|(_, members)| members.len() >= 2)
            .map(|(&layer, members)| (layer, members.as_slice()))
    }

    /// Median layer across all scored nodes (upper median for even counts).
    pub fn median(&self) -> Option<u32> {
        if self.scores.is_empty() {
            return None;
        }
        let mut values: Vec<u32> = self.scores.values().copied().collect();
        values.sort_unstable();
        Some(values[values.len() / 2])
    }

    /// Scored nodes ordered best first: descending layer, ties first-listed-first.
    pub fn ordering(&self) -> Vec<NodeIx> {
        self.layers
            .iter()
            .rev()
            .flat_map(|(_, members)| members.iter().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemId;

    fn graph(names: &[&str], edges: &[(usize, usize)]) -> PreferenceGraph {
        let ids: Vec<ItemId> = names.iter().map(|s| ItemId::from(*s)).collect();
        let mut graph = PreferenceGraph::new(&ids).unwrap();
        for &(w, l) in edges {
            graph.add_choice(w, l);
        }
        graph
    }

    #[test]
    fn test_unconnected_nodes_are_unscored() {
        let g = graph(&["a", "b", "c"], &[(0, 1)]);
        let scores = LayerScores::compute(&g).unwrap();

        assert_eq!(scores.get(0), Some(1));
        assert_eq!(scores.get(1), Some(0));
        assert_eq!(scores.get(2), None);
    }

    #[test]
    fn test_longest_path_wins() {
        // a > b > c, and a > c directly
        let g = graph(&["a", "b", "c"], &[(0, 1), (1, 2), (0, 2)]);
        let scores = LayerScores::compute(&g).unwrap();

        assert_eq!(scores.get(0), Some(2));
        assert_eq!(scores.get(1), Some(1));
        assert_eq!(scores.get(2), Some(0));
        assert_eq!(scores.ordering(), vec![0, 1, 2]);
    }

    #[test]
    fn test_reverse_map_groups_ties_in_list_order() {
        // a beats both c and b
        let g = graph(&["a", "b", "c"], &[(0, 2), (0, 1)]);
        let scores = LayerScores::compute(&g).unwrap();

        assert_eq!(scores.layers().get(&0), Some(&vec![1, 2]));
        let ties: Vec<_> = scores.tie_groups().collect();
        assert_eq!(ties, vec![(0, &[1usize, 2][..])]);
    }

    #[test]
    fn test_cycle_is_invariant_violation() {
        let g = graph(&["a", "b", "c"], &[(0, 1), (1, 2), (2, 0)]);
        let err = LayerScores::compute(&g).unwrap_err();
        assert!(!err.is_usage_error());
    }

    #[test]
    fn test_rescoring_is_idempotent() {
        let g = graph(&["a", "b", "c", "d"], &[(0, 1), (2, 3), (1, 3)]);
        let first = LayerScores::compute(&g).unwrap();
        let second = LayerScores::compute(&g).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_median() {
        let g = graph(&["a", "b", "c"], &[(0, 1), (1, 2)]);
        let scores = LayerScores::compute(&g).unwrap();
        assert_eq!(scores.median(), Some(1));
        assert_eq!(LayerScores::default().median(), None);
    }

    #[test]
    fn test_long_chain_does_not_recurse() {
        let names: Vec<String> = (0..5000).map(|i| format!("t{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let edges: Vec<(usize, usize)> = (0..4999).map(|i| (i, i + 1)).collect();
        let g = graph(&refs, &edges);

        let scores = LayerScores::compute(&g).unwrap();
        assert_eq!(scores.get(0), Some(4999));
    }
}
