//! Service state management.
//!
//! Contains the session registry and shared service state.

use std::num::NonZeroUsize;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::engine::RankingEngine;
use crate::store::RankingStore;

/// Default number of live sessions kept in memory.
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

/// Service configuration loaded from the environment.
///
/// - `HOST`: bind address (default: 0.0.0.0)
/// - `PORT`: bind port (default: 8001)
/// - `LOG_FORMAT`: "json" or "pretty" (default: json)
/// - `RANKER_MAX_SESSIONS`: live session capacity (default: 1024)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Log output format.
    pub log_format: String,
    /// Maximum live sessions before the least recently used is evicted.
    pub max_sessions: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8001,
            log_format: "json".to_string(),
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            log_format: lookup("LOG_FORMAT").unwrap_or(defaults.log_format),
            max_sessions: lookup("RANKER_MAX_SESSIONS")
                .and_then(|s| s.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.max_sessions),
        }
    }

    /// Socket address string.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// One live ranking session.
#[derive(Debug)]
pub struct Session {
    /// Session identifier.
    pub id: Uuid,
    /// What is being ranked.
    pub subject: String,
    /// Who is ranking, if known.
    pub owner: Option<String>,
    /// The engine driving the session.
    pub engine: RankingEngine,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Wrap an initialized engine in a new session.
    pub fn new(subject: impl Into<String>, owner: Option<String>, engine: RankingEngine) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject: subject.into(),
            owner,
            engine,
            created_at: Utc::now(),
        }
    }
}

/// Handle to a session shared between requests.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Bounded registry of live sessions.
///
/// Abandoned sessions need no cleanup; they age out of the LRU.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: Mutex<LruCache<Uuid, SessionHandle>>,
}

impl SessionRegistry {
    /// Create a registry holding at most `capacity` sessions.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            sessions: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Register a session and return its handle.
    pub fn insert(&self, session: Session) -> SessionHandle {
        let id = session.id;
        let handle = Arc::new(Mutex::new(session));
        if let Some((evicted, _)) = self.sessions.lock().push(id, Arc::clone(&handle)) {
            if evicted != id {
                tracing::debug!(session_id = %evicted, "Evicted least recently used session");
            }
        }
        handle
    }

    /// Look up a session, marking it recently used.
    pub fn get(&self, id: &Uuid) -> Option<SessionHandle> {
        self.sessions.lock().get(id).cloned()
    }

    /// Drop a session. Returns whether it existed.
    pub fn remove(&self, id: &Uuid) -> bool {
        self.sessions.lock().pop(id).is_some()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Check if no sessions are live.
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// Maximum number of live sessions.
    pub fn capacity(&self) -> usize {
        self.sessions.lock().cap().get()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SESSIONS)
    }
}

/// Shared service state.
///
/// Contains the ranking store and the live session registry.
pub struct ServiceState<S: RankingStore + 'static> {
    /// Store for finished rankings.
    pub store: Arc<S>,
    /// Live sessions.
    pub sessions: Arc<SessionRegistry>,
}

impl<S: RankingStore + 'static> ServiceState<S> {
    /// Create service state with the default session capacity.
    pub fn new(store: S) -> Self {
        Self::with_capacity(store, DEFAULT_MAX_SESSIONS)
    }

    /// Create service state holding at most `max_sessions` live sessions.
    pub fn with_capacity(store: S, max_sessions: usize) -> Self {
        Self {
            store: Arc::new(store),
            sessions: Arc::new(SessionRegistry::new(max_sessions)),
        }
    }

    /// Create service state from a loaded configuration.
    pub fn from_config(store: S, config: &ServiceConfig) -> Self {
        Self::with_capacity(store, config.max_sessions)
    }
}

impl<S: RankingStore + 'static> Clone for ServiceState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            sessions: Arc::clone(&self.sessions),
        }
    }
}
