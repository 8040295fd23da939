//! Axum routes for the ranking service.

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::engine::RankingEngine;
use crate::error::RankerError;
use crate::policy::RankerPolicy;
use crate::snapshot::{EngineSnapshot, EngineStats};
use crate::store::{RankingRecord, RankingStore};
use crate::types::{ItemId, Matchup};
use crate::RANKER_SCHEMA_VERSION;

use super::middleware::{record_choice_metrics, record_ranking_completed};
use super::state::{ServiceState, Session, SessionHandle};

type ApiError = (StatusCode, Json<ErrorResponse>);

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to start a ranking session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    /// Items to rank, in list order.
    pub items: Vec<String>,
    /// What is being ranked.
    pub subject: String,
    /// Who is ranking.
    #[serde(default)]
    pub owner: Option<String>,
    /// Policy override. Defaults to [`RankerPolicy::default`].
    #[serde(default)]
    pub policy: Option<RankerPolicy>,
}

/// Request to answer the pending matchup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceRequest {
    /// Preferred item.
    pub winner: String,
    /// The other item.
    pub loser: String,
}

/// Session summary returned by most endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    /// Session identifier.
    pub session_id: Uuid,
    /// What is being ranked.
    pub subject: String,
    /// Who is ranking.
    pub owner: Option<String>,
    /// Number of items in the session.
    pub num_items: usize,
    /// Matchup awaiting an answer.
    pub current_matchup: Option<Matchup>,
    /// Whether the ranking is finished.
    pub complete: bool,
    /// Completion estimate in `[0, 1]`.
    pub progress: f64,
    /// Session counters.
    pub stats: EngineStats,
    /// Final ordering once complete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sorting: Option<Vec<ItemId>>,
    /// Hash of the session policy.
    pub policy_hash: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl SessionResponse {
    fn from_session(session: &Session) -> Self {
        let engine = &session.engine;
        Self {
            session_id: session.id,
            subject: session.subject.clone(),
            owner: session.owner.clone(),
            num_items: engine.num_items(),
            current_matchup: engine.current_matchup().ok(),
            complete: engine.is_complete(),
            progress: engine.progress(),
            stats: engine.stats(),
            sorting: engine.final_sorting(),
            policy_hash: engine.policy().params_hash(),
            created_at: session.created_at,
        }
    }
}

/// Session summary plus full engine state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDetailResponse {
    /// Summary.
    #[serde(flatten)]
    pub session: SessionResponse,
    /// Engine state keyed by item.
    pub snapshot: EngineSnapshot,
    /// Snapshot fingerprint.
    pub fingerprint: String,
}

/// Response after recording a choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceResponse {
    /// Updated summary.
    #[serde(flatten)]
    pub session: SessionResponse,
    /// Whether a finished ranking was written to the store by this call.
    pub persisted: bool,
}

/// Pending matchup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchupResponse {
    /// Session identifier.
    pub session_id: Uuid,
    /// The pair to compare.
    pub matchup: Matchup,
}

/// Final ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortingResponse {
    /// Session identifier.
    pub session_id: Uuid,
    /// Items, best first.
    pub sorting: Vec<ItemId>,
}

/// Service health response (detailed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub schema_version: String,
    pub live_sessions: usize,
    pub session_capacity: usize,
    pub store_healthy: bool,
}

/// Simple liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    pub status: String,
}

/// Readiness response with dependency status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub store: bool,
    pub details: Option<String>,
}

/// Structured error response with correlation ID for tracing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Machine-readable error code.
    pub code: String,
    /// Correlation ID for request tracing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Additional error details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response with code and message.
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            correlation_id: None,
            details: None,
        }
    }

    /// Add a correlation ID to the error.
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Add details to the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// HTTP status for a ranker error.
    pub fn status_for(err: &RankerError) -> StatusCode {
        match err {
            RankerError::EmptyPool
            | RankerError::DuplicateItem(_)
            | RankerError::InvalidChoice { .. }
            | RankerError::UnknownNode(_) => StatusCode::BAD_REQUEST,
            RankerError::NoMatchup => StatusCode::CONFLICT,
            RankerError::InvariantViolation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<&RankerError> for ErrorResponse {
    fn from(err: &RankerError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> axum::response::Response {
        tracing::warn!(
            code = %self.code,
            error = %self.error,
            correlation_id = ?self.correlation_id,
            "Request error"
        );
        (StatusCode::BAD_REQUEST, Json(self)).into_response()
    }
}

fn ranker_error(err: &RankerError) -> ApiError {
    (ErrorResponse::status_for(err), Json(ErrorResponse::from(err)))
}

fn parse_session_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(
                ErrorResponse::new("INVALID_SESSION_ID", format!("Invalid session ID: {}", e))
                    .with_details(raw.to_string()),
            ),
        )
    })
}

fn session_not_found(id: &Uuid) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(
            "SESSION_NOT_FOUND",
            format!("Session not found: {}", id),
        )),
    )
}

fn lookup<S: RankingStore + 'static>(
    state: &ServiceState<S>,
    raw_id: &str,
) -> Result<(Uuid, SessionHandle), ApiError> {
    let id = parse_session_id(raw_id)?;
    let handle = state.sessions.get(&id).ok_or_else(|| session_not_found(&id))?;
    Ok((id, handle))
}

/// Write a finished ranking to the store. Failures are logged, not surfaced;
/// the session stays live so the ranking can still be read back.
async fn persist<S: RankingStore + 'static>(state: &ServiceState<S>, record: RankingRecord) -> bool {
    match state.store.save_ranking(&record).await {
        Ok(()) => {
            record_ranking_completed(
                record.positions.len(),
                record.user_choices,
                record.auto_resolutions,
            );
            true
        }
        Err(e) => {
            tracing::error!(
                session_id = %record.session_id,
                error = %e,
                "Failed to persist ranking"
            );
            false
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Start a ranking session.
async fn create_session_handler<S: RankingStore + 'static>(
    State(state): State<Arc<ServiceState<S>>>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<ChoiceResponse>), ApiError> {
    let policy = request.policy.unwrap_or_default();
    let mut engine =
        RankingEngine::with_policy(request.items, policy).map_err(|e| ranker_error(&e))?;
    engine.initialize().map_err(|e| ranker_error(&e))?;

    let session = Session::new(request.subject, request.owner, engine);
    let summary = SessionResponse::from_session(&session);
    let record = RankingRecord::from_engine(
        session.id,
        session.subject.clone(),
        session.owner.clone(),
        &session.engine,
    );
    state.sessions.insert(session);

    tracing::info!(
        session_id = %summary.session_id,
        subject = %summary.subject,
        items = summary.num_items,
        "Ranking session created"
    );

    let persisted = match record {
        Some(record) => persist(&state, record).await,
        None => false,
    };

    Ok((
        StatusCode::CREATED,
        Json(ChoiceResponse {
            session: summary,
            persisted,
        }),
    ))
}

/// Full state of a session.
async fn get_session_handler<S: RankingStore + 'static>(
    State(state): State<Arc<ServiceState<S>>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionDetailResponse>, ApiError> {
    let (_, handle) = lookup(&state, &session_id)?;
    let session = handle.lock();
    let snapshot = session.engine.snapshot();

    Ok(Json(SessionDetailResponse {
        session: SessionResponse::from_session(&session),
        fingerprint: snapshot.fingerprint(),
        snapshot,
    }))
}

/// The matchup awaiting an answer.
async fn matchup_handler<S: RankingStore + 'static>(
    State(state): State<Arc<ServiceState<S>>>,
    Path(session_id): Path<String>,
) -> Result<Json<MatchupResponse>, ApiError> {
    let (id, handle) = lookup(&state, &session_id)?;
    let matchup = handle.lock().engine.current_matchup().map_err(|e| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::from(&e)),
        )
    })?;

    Ok(Json(MatchupResponse {
        session_id: id,
        matchup,
    }))
}

/// Answer the pending matchup.
async fn choice_handler<S: RankingStore + 'static>(
    State(state): State<Arc<ServiceState<S>>>,
    Path(session_id): Path<String>,
    Json(request): Json<ChoiceRequest>,
) -> Result<Json<ChoiceResponse>, ApiError> {
    let (id, handle) = lookup(&state, &session_id)?;

    // Lock scope ends before the store await
    let (summary, record) = {
        let mut session = handle.lock();
        let before = session.engine.stats();

        if let Err(e) = session.engine.make_choice(&request.winner, &request.loser) {
            if !e.is_usage_error() {
                tracing::error!(session_id = %id, error = %e, "Discarding corrupted session");
                state.sessions.remove(&id);
            }
            return Err(ranker_error(&e));
        }

        let after = session.engine.stats();
        record_choice_metrics(
            after.auto_resolutions - before.auto_resolutions,
            session.engine.queue_len(),
            session.engine.is_complete(),
        );

        let record = RankingRecord::from_engine(
            session.id,
            session.subject.clone(),
            session.owner.clone(),
            &session.engine,
        );
        (SessionResponse::from_session(&session), record)
    };

    let persisted = match record {
        Some(record) => persist(&state, record).await,
        None => false,
    };

    Ok(Json(ChoiceResponse {
        session: summary,
        persisted,
    }))
}

/// Final ordering of a completed session.
async fn sorting_handler<S: RankingStore + 'static>(
    State(state): State<Arc<ServiceState<S>>>,
    Path(session_id): Path<String>,
) -> Result<Json<SortingResponse>, ApiError> {
    let (id, handle) = lookup(&state, &session_id)?;
    let sorting = handle.lock().engine.final_sorting().ok_or_else(|| {
        (
            StatusCode::CONFLICT,
            Json(ErrorResponse::new(
                "RANKING_INCOMPLETE",
                format!("Session {} still has matchups to answer", id),
            )),
        )
    })?;

    Ok(Json(SortingResponse {
        session_id: id,
        sorting,
    }))
}

/// Abandon a session.
async fn delete_session_handler<S: RankingStore + 'static>(
    State(state): State<Arc<ServiceState<S>>>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_session_id(&session_id)?;
    if state.sessions.remove(&id) {
        tracing::info!(session_id = %id, "Ranking session deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(session_not_found(&id))
    }
}

/// A persisted ranking.
async fn get_ranking_handler<S: RankingStore + 'static>(
    State(state): State<Arc<ServiceState<S>>>,
    Path(session_id): Path<String>,
) -> Result<Json<RankingRecord>, ApiError> {
    let id = parse_session_id(&session_id)?;
    let record = state.store.get_ranking(&id).await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("STORE_ERROR", format!("Ranking lookup failed: {}", e))),
        )
    })?;

    record.map(Json).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(
                "RANKING_NOT_FOUND",
                format!("No ranking stored for session {}", id),
            )),
        )
    })
}

/// Health check endpoint (detailed).
async fn health_handler<S: RankingStore + 'static>(
    State(state): State<Arc<ServiceState<S>>>,
) -> Json<HealthResponse> {
    let store_healthy = state.store.is_healthy().await;

    Json(HealthResponse {
        status: if store_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        schema_version: RANKER_SCHEMA_VERSION.to_string(),
        live_sessions: state.sessions.len(),
        session_capacity: state.sessions.capacity(),
        store_healthy,
    })
}

/// Liveness probe endpoint. Does NOT check dependencies.
async fn liveness_handler() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "alive".to_string(),
    })
}

/// Readiness probe endpoint.
///
/// Returns 200 if the ranking store is reachable, 503 otherwise.
async fn readiness_handler<S: RankingStore + 'static>(
    State(state): State<Arc<ServiceState<S>>>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    if state.store.is_healthy().await {
        Ok(Json(ReadinessResponse {
            ready: true,
            store: true,
            details: None,
        }))
    } else {
        Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                ready: false,
                store: false,
                details: Some("Ranking store unreachable".to_string()),
            }),
        ))
    }
}

// ============================================================================
// Router Construction
// ============================================================================

/// Create the Axum router for the ranking service.
pub fn create_router<S: RankingStore + 'static>(state: ServiceState<S>) -> Router {
    let state = Arc::new(state);

    Router::new()
        // Sessions
        .route("/api/sessions", post(create_session_handler::<S>))
        .route(
            "/api/sessions/:id",
            get(get_session_handler::<S>).delete(delete_session_handler::<S>),
        )
        .route("/api/sessions/:id/matchup", get(matchup_handler::<S>))
        .route("/api/sessions/:id/choice", post(choice_handler::<S>))
        .route("/api/sessions/:id/sorting", get(sorting_handler::<S>))
        // Persisted rankings
        .route("/api/rankings/:id", get(get_ranking_handler::<S>))
        // Health checks
        .route("/health", get(health_handler::<S>))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler::<S>))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryRankingStore;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        create_router(ServiceState::new(InMemoryRankingStore::new()))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(v) => Body::from(v.to_string()),
                None => Body::empty(),
            })
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create(app: &Router, items: &[&str]) -> String {
        let (status, body) = send(
            app,
            Method::POST,
            "/api/sessions",
            Some(json!({ "items": items, "subject": "album:1" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["session_id"].as_str().unwrap().to_string()
    }

    /// Answer matchups by position in `truth` until none remain.
    async fn answer_all(app: &Router, id: &str, truth: &[&str]) -> usize {
        let rank = |s: &str| truth.iter().position(|t| *t == s).unwrap();
        let mut asked = 0;
        loop {
            let (status, body) =
                send(app, Method::GET, &format!("/api/sessions/{id}/matchup"), None).await;
            if status == StatusCode::NOT_FOUND {
                return asked;
            }
            let first = body["matchup"]["first"].as_str().unwrap().to_string();
            let second = body["matchup"]["second"].as_str().unwrap().to_string();
            let (winner, loser) = if rank(first.as_str()) < rank(second.as_str()) {
                (first, second)
            } else {
                (second, first)
            };
            let (status, _) = send(
                app,
                Method::POST,
                &format!("/api/sessions/{id}/choice"),
                Some(json!({ "winner": winner, "loser": loser })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            asked += 1;
        }
    }

    #[tokio::test]
    async fn test_full_session_is_persisted() {
        let app = app();
        let truth = ["d", "b", "a", "c"];
        let id = create(&app, &["a", "b", "c", "d"]).await;

        let (status, _) = send(&app, Method::GET, &format!("/api/sessions/{id}/sorting"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        assert!(answer_all(&app, &id, &truth).await > 0);

        let (status, body) =
            send(&app, Method::GET, &format!("/api/sessions/{id}/sorting"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sorting"], json!(truth));

        let (status, body) = send(&app, Method::GET, &format!("/api/rankings/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["positions"][0]["item"], "d");
        assert_eq!(body["positions"][0]["position"], 1);
    }

    #[tokio::test]
    async fn test_wrong_pair_is_invalid_choice() {
        let app = app();
        let id = create(&app, &["a", "b", "c"]).await;

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/sessions/{id}/choice"),
            Some(json!({ "winner": "a", "loser": "zzz" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_CHOICE");
    }

    #[tokio::test]
    async fn test_empty_and_duplicate_pools_rejected() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/sessions",
            Some(json!({ "items": [], "subject": "album:1" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "EMPTY_POOL");

        let (_, body) = send(
            &app,
            Method::POST,
            "/api/sessions",
            Some(json!({ "items": ["a", "a"], "subject": "album:1" })),
        )
        .await;
        assert_eq!(body["code"], "DUPLICATE_ITEM");
    }

    #[tokio::test]
    async fn test_single_item_session_completes_at_creation() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/sessions",
            Some(json!({ "items": ["solo"], "subject": "single:1" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["complete"], true);
        assert_eq!(body["persisted"], true);
        assert_eq!(body["sorting"], json!(["solo"]));
    }

    #[tokio::test]
    async fn test_unknown_and_deleted_sessions() {
        let app = app();
        let missing = Uuid::new_v4();
        let (status, body) =
            send(&app, Method::GET, &format!("/api/sessions/{missing}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "SESSION_NOT_FOUND");

        let (status, body) = send(&app, Method::GET, "/api/sessions/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_SESSION_ID");

        let id = create(&app, &["a", "b"]).await;
        let (status, _) = send(&app, Method::DELETE, &format!("/api/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::GET, &format!("/api/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_session_detail_includes_snapshot() {
        let app = app();
        let id = create(&app, &["a", "b", "c"]).await;

        let (status, body) = send(&app, Method::GET, &format!("/api/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["complete"], false);
        assert_eq!(body["snapshot"]["current_matchup"], body["current_matchup"]);
        assert!(body["fingerprint"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let app = app();
        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["schema_version"], RANKER_SCHEMA_VERSION);

        let (status, _) = send(&app, Method::GET, "/health/ready", None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, Method::GET, "/health/live", None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
