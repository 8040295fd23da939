//! PostgreSQL ranking store for production use.
//!
//! ## Configuration
//!
//! All settings can be configured via environment variables:
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 10)
//! - `DB_MIN_CONNECTIONS`: Minimum idle connections (default: 2)
//! - `DB_CONNECT_TIMEOUT_SECS`: Connection timeout (default: 10)
//! - `DB_IDLE_TIMEOUT_SECS`: Idle connection timeout (default: 300)
//! - `DB_MAX_LIFETIME_SECS`: Max connection lifetime (default: 1800)
//!
//! Tables are created from [`RANKING_TABLE_SCHEMA`] by [`PostgresRankingStore::migrate`].

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Executor, Row};
use uuid::Uuid;

use super::RankingStore;
use crate::types::{ItemId, RankedPosition, RankingRecord, RANKING_TABLE_SCHEMA};

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Configuration for PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL.
    pub database_url: String,
    /// Maximum connections in pool (default: 10).
    pub max_connections: u32,
    /// Minimum idle connections to keep warm (default: 2).
    pub min_connections: u32,
    /// Connection acquire timeout in seconds (default: 10).
    pub connect_timeout_secs: u64,
    /// Idle connection timeout in seconds (default: 300 = 5 min).
    pub idle_timeout_secs: u64,
    /// Maximum connection lifetime in seconds (default: 1800 = 30 min).
    pub max_lifetime_secs: u64,
}

impl PostgresConfig {
    /// Load configuration from environment variables with production defaults.
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/rankings".to_string()),
            max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            min_connections: env_or("DB_MIN_CONNECTIONS", 2),
            connect_timeout_secs: env_or("DB_CONNECT_TIMEOUT_SECS", 10),
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT_SECS", 300),
            max_lifetime_secs: env_or("DB_MAX_LIFETIME_SECS", 1800),
        }
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// PostgreSQL ranking store.
pub struct PostgresRankingStore {
    pool: PgPool,
}

impl PostgresRankingStore {
    /// Create a new store with the given configuration.
    pub async fn new(config: PostgresConfig) -> Result<Self, sqlx::Error> {
        tracing::info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            connect_timeout_secs = config.connect_timeout_secs,
            idle_timeout_secs = config.idle_timeout_secs,
            max_lifetime_secs = config.max_lifetime_secs,
            "Initializing PostgreSQL connection pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .test_before_acquire(true)
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Create a store from environment variables.
    pub async fn from_env() -> Result<Self, sqlx::Error> {
        Self::new(PostgresConfig::from_env()).await
    }

    /// Create the ranking tables if they do not exist.
    pub async fn migrate(&self) -> Result<(), PostgresError> {
        // Multi-statement text goes through the simple query protocol.
        self.pool.execute(RANKING_TABLE_SCHEMA).await?;
        Ok(())
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get pool statistics for monitoring.
    pub fn pool_stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
            max: self.pool.options().get_max_connections(),
        }
    }

    fn parse_header_row(row: &PgRow) -> Result<RankingRecord, sqlx::Error> {
        let user_choices: i32 = row.try_get("user_choices")?;
        let auto_resolutions: i32 = row.try_get("auto_resolutions")?;

        Ok(RankingRecord {
            session_id: row.try_get("session_id")?,
            subject: row.try_get("subject")?,
            owner: row.try_get("owner")?,
            policy_hash: row.try_get("policy_hash")?,
            schema_version: row.try_get("schema_version")?,
            positions: Vec::new(),
            user_choices: user_choices.max(0) as u32,
            auto_resolutions: auto_resolutions.max(0) as u32,
            created_at: row.try_get("created_at")?,
        })
    }

    /// Load positions for a set of sessions, keyed by session ID.
    async fn fetch_positions(
        &self,
        session_ids: &[Uuid],
    ) -> Result<BTreeMap<Uuid, Vec<RankedPosition>>, PostgresError> {
        let rows = sqlx::query(
            r#"
            SELECT session_id, item_id, position
            FROM ranking_positions
            WHERE session_id = ANY($1)
            ORDER BY session_id, position
            "#,
        )
        .bind(session_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut positions: BTreeMap<Uuid, Vec<RankedPosition>> = BTreeMap::new();
        for row in &rows {
            let session_id: Uuid = row.try_get("session_id")?;
            let item: String = row.try_get("item_id")?;
            let position: i32 = row.try_get("position")?;
            positions.entry(session_id).or_default().push(RankedPosition {
                item: ItemId::new(item),
                position: position.max(0) as u32,
            });
        }
        Ok(positions)
    }
}

/// Pool statistics for monitoring.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PoolStats {
    /// Current pool size.
    pub size: u32,
    /// Number of idle connections.
    pub idle: usize,
    /// Maximum pool size.
    pub max: u32,
}

/// Error type for PostgreSQL store.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    /// Record has no positions.
    #[error("Ranking for session {0} has no positions")]
    EmptyRanking(Uuid),
}

#[async_trait]
impl RankingStore for PostgresRankingStore {
    type Error = PostgresError;

    async fn save_ranking(&self, record: &RankingRecord) -> Result<(), Self::Error> {
        if record.positions.is_empty() {
            return Err(PostgresError::EmptyRanking(record.session_id));
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO rankings (
                session_id, subject, owner, policy_hash, schema_version,
                user_choices, auto_resolutions, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (session_id) DO UPDATE SET
                subject = EXCLUDED.subject,
                owner = EXCLUDED.owner,
                policy_hash = EXCLUDED.policy_hash,
                schema_version = EXCLUDED.schema_version,
                user_choices = EXCLUDED.user_choices,
                auto_resolutions = EXCLUDED.auto_resolutions,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(record.session_id)
        .bind(&record.subject)
        .bind(&record.owner)
        .bind(&record.policy_hash)
        .bind(&record.schema_version)
        .bind(record.user_choices as i32)
        .bind(record.auto_resolutions as i32)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM ranking_positions WHERE session_id = $1")
            .bind(record.session_id)
            .execute(&mut *tx)
            .await?;

        let items: Vec<String> = record
            .positions
            .iter()
            .map(|p| p.item.as_str().to_string())
            .collect();
        let positions: Vec<i32> = record.positions.iter().map(|p| p.position as i32).collect();

        sqlx::query(
            r#"
            INSERT INTO ranking_positions (session_id, item_id, position)
            SELECT $1, item_id, position
            FROM UNNEST($2::text[], $3::int4[]) AS t(item_id, position)
            "#,
        )
        .bind(record.session_id)
        .bind(&items)
        .bind(&positions)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(
            session_id = %record.session_id,
            subject = %record.subject,
            items = record.positions.len(),
            "Saved ranking"
        );
        Ok(())
    }

    async fn get_ranking(&self, session_id: &Uuid) -> Result<Option<RankingRecord>, Self::Error> {
        let row = sqlx::query(
            r#"
            SELECT session_id, subject, owner, policy_hash, schema_version,
                   user_choices, auto_resolutions, created_at
            FROM rankings
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut record = Self::parse_header_row(&row)?;
        record.positions = self
            .fetch_positions(&[record.session_id])
            .await?
            .remove(&record.session_id)
            .unwrap_or_default();
        Ok(Some(record))
    }

    async fn list_rankings(&self, subject: &str) -> Result<Vec<RankingRecord>, Self::Error> {
        let rows = sqlx::query(
            r#"
            SELECT session_id, subject, owner, policy_hash, schema_version,
                   user_choices, auto_resolutions, created_at
            FROM rankings
            WHERE subject = $1
            ORDER BY created_at, session_id
            "#,
        )
        .bind(subject)
        .fetch_all(&self.pool)
        .await?;

        let mut records = rows
            .iter()
            .map(Self::parse_header_row)
            .collect::<Result<Vec<_>, _>>()?;

        let ids: Vec<Uuid> = records.iter().map(|r| r.session_id).collect();
        let mut positions = self.fetch_positions(&ids).await?;
        for record in &mut records {
            record.positions = positions.remove(&record.session_id).unwrap_or_default();
        }

        Ok(records)
    }

    async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}
