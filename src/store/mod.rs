//! Ranking storage backends.
//!
//! The engine never persists its own intermediate state; stores only ever
//! see finished rankings.

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

pub use crate::types::{RankedPosition, RankingRecord};

/// Trait for ranking storage backends.
///
/// Saving a record for a session that already has one replaces it.
/// Listing is ordered by `created_at`, then session ID.
#[async_trait]
pub trait RankingStore: Send + Sync {
    /// Error type for store operations.
    type Error: std::error::Error + Send + Sync;

    /// Persist a finished ranking.
    async fn save_ranking(&self, record: &RankingRecord) -> Result<(), Self::Error>;

    /// Fetch the ranking produced by a session.
    async fn get_ranking(&self, session_id: &Uuid) -> Result<Option<RankingRecord>, Self::Error>;

    /// Fetch every ranking of a subject.
    async fn list_rankings(&self, subject: &str) -> Result<Vec<RankingRecord>, Self::Error>;

    /// Check whether the backend is reachable.
    async fn is_healthy(&self) -> bool {
        true
    }
}

pub use memory::InMemoryRankingStore;

#[cfg(feature = "postgres")]
pub use postgres::PostgresRankingStore;
