//! # pairwise-ranker
//!
//! Incremental pairwise-comparison ranking.
//!
//! The ranker answers one question:
//!
//! > Given N items and a stream of human "A beats B" judgments, what is the
//! > next comparison worth asking?
//!
//! ## Core Contract
//!
//! 1. Never ask a question whose answer is implied by earlier answers
//! 2. Never let a contradictory judgment into the preference graph
//! 3. Finish with a total order once every tie has been broken
//!
//! ## Architecture
//!
//! ```text
//! make_choice → PreferenceGraph → ChoiceCache → LayerScores
//!                                                    ↓
//!        current_matchup ← drain ← MatchupQueue ← ties + new items
//!                                                    ↓
//!                                     RankingStore (Postgres or Memory)
//! ```
//!
//! ## Quick start
//!
//! ```rust
//! use pairwise_ranker::{ItemId, RankingEngine};
//!
//! let mut engine = RankingEngine::new(["a", "b"]).unwrap();
//! engine.initialize().unwrap();
//!
//! let matchup = engine.current_matchup().unwrap();
//! assert!(matchup.is_pair(&"a".into(), &"b".into()));
//!
//! engine.make_choice("a", "b").unwrap();
//! assert!(engine.is_complete());
//! assert_eq!(engine.sorting(), vec![ItemId::from("a"), ItemId::from("b")]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod canonical;
pub mod engine;
pub mod error;
pub mod graph;
pub mod policy;
pub mod queue;
pub mod snapshot;
pub mod store;
pub mod types;

#[cfg(feature = "service")]
pub mod service;

// Re-exports
pub use cache::ChoiceCache;
pub use canonical::{canonical_hash, canonical_hash_hex, to_canonical_bytes};
pub use engine::RankingEngine;
pub use error::RankerError;
pub use graph::{LayerScores, Node, NodeIx, PreferenceGraph};
pub use policy::{find_best_match, PairingStrategy, RankerPolicy};
pub use queue::MatchupQueue;
pub use snapshot::{EngineSnapshot, EngineStats};
pub use store::{InMemoryRankingStore, RankedPosition, RankingRecord, RankingStore};
#[cfg(feature = "postgres")]
pub use store::PostgresRankingStore;
pub use types::{Choice, ItemId, Matchup, RecordedChoice, Resolution};

// Service re-exports (when service feature is enabled)
#[cfg(feature = "service")]
pub use service::{create_router, ServiceConfig, ServiceState, SessionRegistry};

/// Schema version for persisted ranking records.
/// Increment on breaking changes to any schema type.
pub const RANKER_SCHEMA_VERSION: &str = "1.0.0";

/// Default policy version identifier.
pub const DEFAULT_POLICY_VERSION: &str = "ranker_policy_v1";
