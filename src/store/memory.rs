//! In-memory ranking store for testing and single-node deployments.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::RankingStore;
use crate::types::RankingRecord;

/// Error type for in-memory store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InMemoryError {
    /// Record has no positions.
    #[error("Ranking for session {0} has no positions")]
    EmptyRanking(Uuid),
}

/// In-memory ranking store.
///
/// Uses BTreeMap for deterministic iteration order.
#[derive(Debug, Default)]
pub struct InMemoryRankingStore {
    rankings: RwLock<BTreeMap<Uuid, RankingRecord>>,
}

impl InMemoryRankingStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get number of stored rankings.
    pub fn num_rankings(&self) -> usize {
        self.rankings.read().len()
    }
}

#[async_trait]
impl RankingStore for InMemoryRankingStore {
    type Error = InMemoryError;

    async fn save_ranking(&self, record: &RankingRecord) -> Result<(), Self::Error> {
        if record.positions.is_empty() {
            return Err(InMemoryError::EmptyRanking(record.session_id));
        }
        self.rankings.write().insert(record.session_id, record.clone());
        Ok(())
    }

    async fn get_ranking(&self, session_id: &Uuid) -> Result<Option<RankingRecord>, Self::Error> {
        Ok(self.rankings.read().get(session_id).cloned())
    }

    async fn list_rankings(&self, subject: &str) -> Result<Vec<RankingRecord>, Self::Error> {
        let mut result: Vec<RankingRecord> = self
            .rankings
            .read()
            .values()
            .filter(|r| r.subject == subject)
            .cloned()
            .collect();

        // Sort for determinism
        result.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });

        Ok(result)
    }
}
