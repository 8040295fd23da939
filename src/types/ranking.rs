//! Persisted ranking records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::item::ItemId;
use crate::engine::RankingEngine;
use crate::RANKER_SCHEMA_VERSION;

/// One item's final position (1 = best).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedPosition {
    /// Ranked item.
    pub item: ItemId,
    /// 1-based position.
    pub position: u32,
}

/// A finished ranking, as handed to a [`RankingStore`](crate::store::RankingStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingRecord {
    /// Session that produced the ranking.
    pub session_id: Uuid,
    /// What was ranked (e.g. an album or artist key).
    pub subject: String,
    /// Who ranked it, if known.
    pub owner: Option<String>,
    /// Hash of the policy the session ran with.
    pub policy_hash: String,
    /// Record schema version.
    pub schema_version: String,
    /// Positions, best first.
    pub positions: Vec<RankedPosition>,
    /// Questions the user answered.
    pub user_choices: u32,
    /// Questions answered from the choice cache.
    pub auto_resolutions: u32,
    /// When the ranking was completed.
    pub created_at: DateTime<Utc>,
}

impl RankingRecord {
    /// Build a record from a completed engine. Returns `None` while the
    /// session is still in progress.
    pub fn from_engine(
        session_id: Uuid,
        subject: impl Into<String>,
        owner: Option<String>,
        engine: &RankingEngine,
    ) -> Option<Self> {
        let sorting = engine.final_sorting()?;
        let stats = engine.stats();

        Some(Self {
            session_id,
            subject: subject.into(),
            owner,
            policy_hash: engine.policy().params_hash(),
            schema_version: RANKER_SCHEMA_VERSION.to_string(),
            positions: sorting
                .into_iter()
                .enumerate()
                .map(|(i, item)| RankedPosition {
                    item,
                    position: i as u32 + 1,
                })
                .collect(),
            user_choices: stats.user_choices as u32,
            auto_resolutions: stats.auto_resolutions as u32,
            created_at: Utc::now(),
        })
    }

    /// Items in ranked order.
    pub fn ordering(&self) -> Vec<ItemId> {
        let mut positions: Vec<&RankedPosition> = self.positions.iter().collect();
        positions.sort_by_key(|p| p.position);
        positions.into_iter().map(|p| p.item.clone()).collect()
    }

    /// Position of an item, if ranked.
    pub fn position_of(&self, item: &str) -> Option<u32> {
        self.positions
            .iter()
            .find(|p| p.item.as_str() == item)
            .map(|p| p.position)
    }
}

/// SQL schema for persisted rankings.
pub const RANKING_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS rankings (
    session_id UUID PRIMARY KEY,
    subject TEXT NOT NULL,
    owner TEXT,
    policy_hash TEXT NOT NULL,
    schema_version TEXT NOT NULL,
    user_choices INTEGER NOT NULL,
    auto_resolutions INTEGER NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS ranking_positions (
    session_id UUID NOT NULL REFERENCES rankings(session_id) ON DELETE CASCADE,
    item_id TEXT NOT NULL,
    position INTEGER NOT NULL,

    PRIMARY KEY (session_id, item_id),
    CONSTRAINT ranking_position_positive CHECK (position > 0)
);

CREATE INDEX IF NOT EXISTS idx_rankings_subject
    ON rankings(subject, created_at);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn finished_engine() -> RankingEngine {
        let mut engine = RankingEngine::new(["b", "a"]).unwrap();
        engine.initialize().unwrap();
        engine.make_choice("a", "b").unwrap();
        engine
    }

    #[test]
    fn test_record_from_complete_engine() {
        let engine = finished_engine();
        let record = RankingRecord::from_engine(Uuid::from_u128(1), "album:1", None, &engine).unwrap();

        assert_eq!(record.ordering(), vec![ItemId::from("a"), ItemId::from("b")]);
        assert_eq!(record.position_of("b"), Some(2));
        assert_eq!(record.user_choices, 1);
        assert_eq!(record.schema_version, RANKER_SCHEMA_VERSION);
    }

    #[test]
    fn test_no_record_while_in_progress() {
        let mut engine = RankingEngine::new(["a", "b"]).unwrap();
        engine.initialize().unwrap();
        assert!(RankingRecord::from_engine(Uuid::from_u128(1), "album:1", None, &engine).is_none());
    }
}
