//! Ranking REST Service
//!
//! Runs ranking sessions behind an HTTP API and persists finished rankings.
//!
//! ## Endpoints
//!
//! - `POST /api/sessions` - Start a session over a list of items
//! - `GET /api/sessions/:id` - Session summary and engine snapshot
//! - `DELETE /api/sessions/:id` - Abandon a session
//! - `GET /api/sessions/:id/matchup` - Pending matchup (404 when none)
//! - `POST /api/sessions/:id/choice` - Answer the pending matchup
//! - `GET /api/sessions/:id/sorting` - Final ordering (409 until complete)
//! - `GET /api/rankings/:id` - Persisted ranking of a finished session
//! - `GET /health` - Detailed service health check
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe

pub mod middleware;
pub mod routes;
pub mod state;

pub use middleware::{metrics_middleware, record_choice_metrics, record_ranking_completed};
pub use routes::{create_router, ErrorResponse};
pub use state::{ServiceConfig, ServiceState, Session, SessionHandle, SessionRegistry};
