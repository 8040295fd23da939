//! Preference graph: the directed "beats" relation between items.
//!
//! Nodes live in an arena indexed by [`NodeIx`] (position in the initial item
//! list). An edge `winner -> loser` is stored twice: in the winner's `below`
//! set (read by scoring) and in the loser's `above` set (bookkeeping).
//!
//! The graph does not prevent cycles. Keeping it acyclic is the engine's job:
//! it only records choices for matchups the choice cache cannot answer.

pub mod scoring;

use std::collections::{BTreeSet, HashMap, VecDeque};

use crate::error::RankerError;
use crate::types::ItemId;

pub use scoring::LayerScores;

/// Index of a node in the graph arena.
pub type NodeIx = usize;

/// A single item in the preference graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    ix: NodeIx,
    id: ItemId,
    /// Nodes known to beat this one.
    above: BTreeSet<NodeIx>,
    /// Nodes this one has beaten.
    below: BTreeSet<NodeIx>,
}

impl Node {
    fn new(ix: NodeIx, id: ItemId) -> Self {
        Self {
            ix,
            id,
            above: BTreeSet::new(),
            below: BTreeSet::new(),
        }
    }

    /// Record that this node beat `other`. Self-loops are ignored.
    pub fn create_below_edge(&mut self, other: NodeIx) {
        if other != self.ix {
            self.below.insert(other);
        }
    }

    /// Record that `other` beat this node. Self-loops are ignored.
    pub fn create_above_edge(&mut self, other: NodeIx) {
        if other != self.ix {
            self.above.insert(other);
        }
    }

    /// Drop `other` from the below set. Returns whether an edge was removed.
    pub fn remove_edge(&mut self, other: NodeIx) -> bool {
        self.below.remove(&other)
    }

    /// Arena index.
    pub fn ix(&self) -> NodeIx {
        self.ix
    }

    /// Item identifier.
    pub fn id(&self) -> &ItemId {
        &self.id
    }

    /// Nodes known to beat this one.
    pub fn above(&self) -> &BTreeSet<NodeIx> {
        &self.above
    }

    /// Nodes this one has beaten (scoring edges).
    pub fn below(&self) -> &BTreeSet<NodeIx> {
        &self.below
    }

    /// Whether the node has taken part in at least one recorded choice.
    pub fn has_edges(&self) -> bool {
        !self.above.is_empty() || !self.below.is_empty()
    }
}

/// Directed acyclic preference graph over a fixed set of items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceGraph {
    nodes: Vec<Node>,
    index: HashMap<ItemId, NodeIx>,
}

impl PreferenceGraph {
    /// Build a graph with one node per item and no edges.
    ///
    /// Fails with [`RankerError::DuplicateItem`] if an identifier repeats.
    pub fn new(items: &[ItemId]) -> Result<Self, RankerError> {
        let mut index = HashMap::with_capacity(items.len());
        let mut nodes = Vec::with_capacity(items.len());
        for (ix, id) in items.iter().enumerate() {
            if index.insert(id.clone(), ix).is_some() {
                return Err(RankerError::DuplicateItem(id.clone()));
            }
            nodes.push(Node::new(ix, id.clone()));
        }
        Ok(Self { nodes, index })
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up the arena index of an item.
    pub fn index_of(&self, id: &str) -> Option<NodeIx> {
        self.index.get(id).copied()
    }

    /// Look up the arena index of an item, failing with `UnknownNode`.
    pub fn require(&self, id: &ItemId) -> Result<NodeIx, RankerError> {
        self.index_of(id.as_str())
            .ok_or_else(|| RankerError::UnknownNode(id.clone()))
    }

    /// Get a node by index.
    pub fn node(&self, ix: NodeIx) -> &Node {
        &self.nodes[ix]
    }

    /// Get the identifier of a node.
    pub fn id(&self, ix: NodeIx) -> &ItemId {
        &self.nodes[ix].id
    }

    /// Iterate over all nodes in arena order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Record `winner` beating `loser` on both endpoints.
    pub fn add_choice(&mut self, winner: NodeIx, loser: NodeIx) {
        self.nodes[winner].create_below_edge(loser);
        self.nodes[loser].create_above_edge(winner);
    }

    /// Remove the scoring edge `from -> to`. The `above` bookkeeping is kept.
    pub fn remove_edge(&mut self, from: NodeIx, to: NodeIx) -> bool {
        self.nodes[from].remove_edge(to)
    }

    /// Check whether `from` directly beats `to`.
    pub fn has_edge(&self, from: NodeIx, to: NodeIx) -> bool {
        self.nodes[from].below.contains(&to)
    }

    /// Number of scoring edges.
    pub fn num_edges(&self) -> usize {
        self.nodes.iter().map(|n| n.below.len()).sum()
    }

    /// All scoring edges as `(winner, loser)` identifier pairs, in arena order.
    pub fn edges(&self) -> Vec<(ItemId, ItemId)> {
        self.nodes
            .iter()
            .flat_map(|n| n.below.iter().map(move |&c| (n.id.clone(), self.nodes[c].id.clone())))
            .collect()
    }

    /// Check whether a directed path `from -> ... -> to` exists via scoring edges.
    pub fn has_path(&self, from: NodeIx, to: NodeIx) -> bool {
        if from == to {
            return true;
        }
        let mut seen = vec![false; self.nodes.len()];
        let mut queue = VecDeque::from([from]);
        seen[from] = true;
        while let Some(ix) = queue.pop_front() {
            for &child in &self.nodes[ix].below {
                if child == to {
                    return true;
                }
                if !seen[child] {
                    seen[child] = true;
                    queue.push_back(child);
                }
            }
        }
        false
    }

    /// Check that no directed cycle exists (Kahn's algorithm).
    pub fn is_acyclic(&self) -> bool {
        let mut in_degree = vec![0usize; self.nodes.len()];
        for node in &self.nodes {
            for &child in &node.below {
                in_degree[child] += 1;
            }
        }
        let mut ready: Vec<NodeIx> = (0..self.nodes.len()).filter(|&ix| in_degree[ix] == 0).collect();
        let mut visited = 0;
        while let Some(ix) = ready.pop() {
            visited += 1;
            for &child in &self.nodes[ix].below {
                in_degree[child] -= 1;
                if in_degree[child] == 0 {
                    ready.push(child);
                }
            }
        }
        visited == self.nodes.len()
    }
}
