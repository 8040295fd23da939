//! Incremental pairwise-comparison ranking engine.
//!
//! The engine turns a stream of "A beats B" judgments into a total order
//! while asking as few questions as it can.
//!
//! ## Algorithm
//!
//! Each recorded choice runs the same pipeline:
//!
//! 1. Add the edge `winner -> loser` to the preference graph
//! 2. Update the choice cache (full transitive closure)
//! 3. Rebuild layer scores (longest path to a sink)
//! 4. Introduce one unintroduced item, paired by the matching policy
//! 5. Prune edges spanning more than one layer; enqueue tie matchups
//!    for every layer holding two or more items
//!
//! The queue is then drained: matchups between items on different layers
//! are dropped, matchups the cache can answer are recorded as inferred
//! choices (re-running the pipeline), and the first remaining matchup is
//! surfaced to the user. The session is complete once the queue and the
//! unintroduced pool are both empty.
//!
//! ## Invariants
//!
//! - The graph never contains a cycle: only matchups without a cached
//!   verdict reach the user, and inferred choices follow the cache
//! - `beats(a, b)` implies a chain of recorded choices from `a` to `b`
//! - A failed `make_choice` validation leaves all state untouched

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::cache::ChoiceCache;
use crate::error::RankerError;
use crate::graph::{LayerScores, NodeIx, PreferenceGraph};
use crate::policy::{find_best_match, RankerPolicy};
use crate::queue::MatchupQueue;
use crate::snapshot::{EngineSnapshot, EngineStats};
use crate::types::{Choice, ItemId, Matchup, RecordedChoice, Resolution};

/// Incremental ranking engine for one session.
///
/// Single-threaded and synchronous: `make_choice` runs every inferred
/// follow-up before returning. Hosts serving several users must keep one
/// instance per session.
#[derive(Debug, Clone)]
pub struct RankingEngine {
    graph: PreferenceGraph,
    scores: LayerScores,
    cache: ChoiceCache,
    /// Items not yet introduced into any matchup.
    pool: BTreeSet<NodeIx>,
    queue: MatchupQueue<NodeIx>,
    current: Option<(NodeIx, NodeIx)>,
    initialized: bool,
    policy: RankerPolicy,
    stats: EngineStats,
    history: Vec<RecordedChoice>,
}

impl RankingEngine {
    /// Create an engine with the default policy.
    ///
    /// Fails with [`RankerError::DuplicateItem`] if an identifier repeats.
    pub fn new<I, T>(items: I) -> Result<Self, RankerError>
    where
        I: IntoIterator<Item = T>,
        T: Into<ItemId>,
    {
        Self::with_policy(items, RankerPolicy::default())
    }

    /// Create an engine with a custom policy.
    pub fn with_policy<I, T>(items: I, policy: RankerPolicy) -> Result<Self, RankerError>
    where
        I: IntoIterator<Item = T>,
        T: Into<ItemId>,
    {
        let items: Vec<ItemId> = items.into_iter().map(Into::into).collect();
        let graph = PreferenceGraph::new(&items)?;
        let pool = (0..graph.len()).collect();

        Ok(Self {
            graph,
            scores: LayerScores::default(),
            cache: ChoiceCache::new(),
            pool,
            queue: MatchupQueue::new(),
            current: None,
            initialized: false,
            policy,
            stats: EngineStats::default(),
            history: Vec::new(),
        })
    }

    /// Generate the first matchup.
    ///
    /// Fails with [`RankerError::EmptyPool`] if there is nothing left to
    /// introduce. A single-item pool completes immediately.
    pub fn initialize(&mut self) -> Result<(), RankerError> {
        if self.pool.is_empty() {
            return Err(RankerError::EmptyPool);
        }
        self.initialized = true;
        self.gen_choice();
        self.advance()?;

        debug!(
            items = self.graph.len(),
            pending = ?self.current_matchup().ok(),
            "ranking session initialized"
        );
        Ok(())
    }

    /// The matchup awaiting a user decision.
    pub fn current_matchup(&self) -> Result<Matchup, RankerError> {
        self.current
            .map(|(a, b)| self.matchup(a, b))
            .ok_or(RankerError::NoMatchup)
    }

    /// Whether the queue and pool are empty and nothing is pending.
    pub fn is_complete(&self) -> bool {
        self.initialized && self.current.is_none() && self.queue.is_empty() && self.pool.is_empty()
    }

    /// Record the user's answer to the pending matchup.
    ///
    /// Validation happens before any mutation: on `NoMatchup`,
    /// `InvalidChoice` or `UnknownNode` the engine is unchanged.
    pub fn make_choice(
        &mut self,
        winner: impl AsRef<str>,
        loser: impl AsRef<str>,
    ) -> Result<(), RankerError> {
        let (winner, loser) = (winner.as_ref(), loser.as_ref());
        let (a, b) = self.current.ok_or(RankerError::NoMatchup)?;

        let (ida, idb) = (self.graph.id(a).as_str(), self.graph.id(b).as_str());
        let matches = (winner == ida && loser == idb) || (winner == idb && loser == ida);
        if !matches {
            return Err(RankerError::InvalidChoice {
                winner: ItemId::from(winner),
                loser: ItemId::from(loser),
            });
        }

        let w = self.graph.require(&ItemId::from(winner))?;
        let l = self.graph.require(&ItemId::from(loser))?;

        self.current = None;
        self.record(w, l, Resolution::User)?;
        self.advance()?;

        if self.is_complete() {
            info!(
                items = self.graph.len(),
                user_choices = self.stats.user_choices,
                auto_resolutions = self.stats.auto_resolutions,
                "ranking complete"
            );
        }
        Ok(())
    }

    /// Final ordering, best first.
    ///
    /// Layers are concatenated in descending order, ties first-listed-first.
    /// Items never scored (only possible for a single-item pool or before
    /// completion) follow in list order. The ordering is only meaningful
    /// once [`is_complete`](Self::is_complete) is true.
    pub fn sorting(&self) -> Vec<ItemId> {
        let mut order = self.scores.ordering();
        order.extend((0..self.graph.len()).filter(|&ix| !self.scores.is_scored(ix)));
        order.into_iter().map(|ix| self.graph.id(ix).clone()).collect()
    }

    /// Final ordering if the session is complete.
    pub fn final_sorting(&self) -> Option<Vec<ItemId>> {
        self.is_complete().then(|| self.sorting())
    }

    /// Layer of an item, if it has been scored.
    pub fn score(&self, id: &str) -> Option<u32> {
        self.graph.index_of(id).and_then(|ix| self.scores.get(ix))
    }

    /// Whether the choice cache knows `a` beats `b`.
    pub fn beats(&self, a: &str, b: &str) -> bool {
        match (self.graph.index_of(a), self.graph.index_of(b)) {
            (Some(a), Some(b)) => self.cache.beats(a, b),
            _ => false,
        }
    }

    /// Rough completion estimate in `[0, 1]`: distinct layers over items.
    pub fn progress(&self) -> f64 {
        if self.is_complete() {
            return 1.0;
        }
        if self.graph.is_empty() {
            return 0.0;
        }
        self.scores.layers().len() as f64 / self.graph.len() as f64
    }

    /// Number of items in the session.
    pub fn num_items(&self) -> usize {
        self.graph.len()
    }

    /// Number of queued matchups.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Number of items not yet introduced.
    pub fn unintroduced_len(&self) -> usize {
        self.pool.len()
    }

    /// The preference graph.
    pub fn graph(&self) -> &PreferenceGraph {
        &self.graph
    }

    /// The current layer scores.
    pub fn scores(&self) -> &LayerScores {
        &self.scores
    }

    /// The choice cache.
    pub fn cache(&self) -> &ChoiceCache {
        &self.cache
    }

    /// The active policy.
    pub fn policy(&self) -> &RankerPolicy {
        &self.policy
    }

    /// Session counters.
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Every recorded choice in order, user and inferred.
    pub fn history(&self) -> &[RecordedChoice] {
        &self.history
    }

    /// Plain copy of the engine state keyed by identifier.
    pub fn snapshot(&self) -> EngineSnapshot {
        let id = |ix: NodeIx| self.graph.id(ix).clone();

        EngineSnapshot {
            scores: self
                .scores
                .scores()
                .iter()
                .map(|(&ix, &layer)| (id(ix), layer))
                .collect(),
            layers: self
                .scores
                .layers()
                .iter()
                .map(|(&layer, members)| (layer, members.iter().map(|&ix| id(ix)).collect()))
                .collect(),
            current_matchup: self.current_matchup().ok(),
            unintroduced: self.pool.iter().map(|&ix| id(ix)).collect(),
            queued: self.queue.iter().map(|&(a, b)| self.matchup(a, b)).collect(),
            edges: self.graph.edges(),
            implied: self.cache.pairs().map(|(w, l)| (id(w), id(l))).collect(),
            complete: self.is_complete(),
            stats: self.stats,
        }
    }

    /// Rebuild layer scores from the graph.
    pub fn rescore(&mut self) -> Result<(), RankerError> {
        self.scores = LayerScores::compute(&self.graph)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn matchup(&self, a: NodeIx, b: NodeIx) -> Matchup {
        Matchup::new(self.graph.id(a).clone(), self.graph.id(b).clone())
    }

    /// Record a choice and rebalance: graph, cache, scores, introduction, branches.
    fn record(&mut self, winner: NodeIx, loser: NodeIx, resolution: Resolution) -> Result<(), RankerError> {
        self.graph.add_choice(winner, loser);
        let implied = self.cache.record(winner, loser);
        self.rescore()?;

        match resolution {
            Resolution::User => self.stats.user_choices += 1,
            Resolution::Inferred => self.stats.auto_resolutions += 1,
        }
        self.history.push(RecordedChoice {
            choice: Choice::new(self.graph.id(winner).clone(), self.graph.id(loser).clone()),
            resolution,
        });

        debug!(
            winner = %self.graph.id(winner),
            loser = %self.graph.id(loser),
            %resolution,
            implied,
            layers = self.scores.layers().len(),
            "choice recorded"
        );

        self.gen_choice();
        self.resolve_branches()
    }

    /// Introduce the next unintroduced item, paired by the matching policy.
    fn gen_choice(&mut self) {
        let Some(candidate) = self.pool.pop_first() else {
            return;
        };

        match find_best_match(candidate, &self.pool, &self.scores, self.policy.pairing) {
            Some(opponent) => {
                self.pool.remove(&opponent);
                self.queue.enqueue(candidate, opponent);
                debug!(
                    item = %self.graph.id(candidate),
                    opponent = %self.graph.id(opponent),
                    "item introduced"
                );
            }
            None => debug!(item = %self.graph.id(candidate), "item introduced without opponent"),
        }
    }

    /// Prune edges that skip a layer, then enqueue tie-breaking matchups.
    fn resolve_branches(&mut self) -> Result<(), RankerError> {
        if self.policy.prune_redundant_edges {
            let mut redundant = Vec::new();
            for (&parent, &layer) in self.scores.scores() {
                for &child in self.graph.node(parent).below() {
                    let child_layer = self.scores.get(child).ok_or_else(|| {
                        RankerError::invariant(format!(
                            "beaten item {} has no layer",
                            self.graph.id(child)
                        ))
                    })?;
                    if layer.saturating_sub(child_layer) > 1 {
                        redundant.push((parent, child));
                    }
                }
            }
            for (parent, child) in redundant {
                self.graph.remove_edge(parent, child);
                self.stats.pruned_edges += 1;
            }
        }

        for (_, members) in self.scores.tie_groups() {
            for pair in members.chunks_exact(2) {
                self.queue.enqueue(pair[0], pair[1]);
            }
        }
        Ok(())
    }

    /// Matchups between unscored items, or items sharing a layer, may be asked.
    fn is_safe(&self, a: NodeIx, b: NodeIx) -> bool {
        match (self.scores.get(a), self.scores.get(b)) {
            (Some(la), Some(lb)) => la == lb,
            _ => true,
        }
    }

    /// Drain the queue until a matchup needs the user or the session completes.
    fn advance(&mut self) -> Result<(), RankerError> {
        let limit = self.policy.auto_resolution_limit(self.graph.len());
        let mut inferred = 0;

        loop {
            let Some((a, b)) = self.queue.dequeue() else {
                if !self.pool.is_empty() {
                    self.gen_choice();
                    continue;
                }
                self.current = None;
                return Ok(());
            };

            if !self.is_safe(a, b) {
                self.stats.skipped_matchups += 1;
                debug!(
                    first = %self.graph.id(a),
                    second = %self.graph.id(b),
                    "matchup dropped, layers diverged"
                );
                continue;
            }

            if let Some((winner, loser)) = self.cache.verdict(a, b) {
                inferred += 1;
                if inferred > limit {
                    return Err(RankerError::invariant(format!(
                        "auto-resolution did not settle after {limit} steps"
                    )));
                }
                self.record(winner, loser, Resolution::Inferred)?;
                continue;
            }

            self.current = Some((a, b));
            return Ok(());
        }
    }
}
