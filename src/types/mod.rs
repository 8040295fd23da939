//! Core types for the ranking engine.

pub mod item;
pub mod matchup;
pub mod ranking;

pub use item::ItemId;
pub use matchup::{Choice, Matchup, RecordedChoice, Resolution};
pub use ranking::{RankedPosition, RankingRecord, RANKING_TABLE_SCHEMA};
