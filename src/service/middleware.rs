//! Service middleware for metrics and request tracking.
//!
//! ## Metrics Exposed
//!
//! All metrics are emitted as structured log events on the
//! `pairwise_ranker::metrics` target:
//!
//! - `request` - path pattern, method, status, latency
//! - `choice` - auto-resolutions triggered and queue depth after each answer
//! - `ranking_completed` - item count and question counts of a finished ranking

use std::sync::OnceLock;
use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use regex_lite::Regex;
use tracing::info;

/// Metrics middleware that records request counts and latency.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = normalize_path(request.uri().path());

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status().as_u16();

    info!(
        target: "pairwise_ranker::metrics",
        metric_type = "request",
        path = %path,
        method = %method,
        status = status,
        latency_ms = latency.as_millis() as u64,
        "request_metric"
    );

    response
}

/// Normalize path for metrics to avoid high cardinality.
///
/// Session IDs are replaced with `:id`.
fn normalize_path(path: &str) -> String {
    static UUID_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = UUID_PATTERN.get_or_init(|| {
        Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
            .ok()
    });

    match pattern {
        Some(re) => re.replace_all(path, ":id").into_owned(),
        None => path.to_string(),
    }
}

/// Record the outcome of one user answer.
pub fn record_choice_metrics(auto_resolutions: usize, queue_len: usize, complete: bool) {
    info!(
        target: "pairwise_ranker::metrics",
        metric_type = "choice",
        auto_resolutions = auto_resolutions,
        queue_len = queue_len,
        complete = complete,
        "choice_metric"
    );
}

/// Record a finished, persisted ranking.
pub fn record_ranking_completed(items: usize, user_choices: u32, auto_resolutions: u32) {
    info!(
        target: "pairwise_ranker::metrics",
        metric_type = "ranking_completed",
        items = items,
        user_choices = user_choices,
        auto_resolutions = auto_resolutions,
        "ranking_completed_metric"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_replaces_uuid() {
        let path = "/api/sessions/550e8400-e29b-41d4-a716-446655440000/choice";
        assert_eq!(normalize_path(path), "/api/sessions/:id/choice");
    }

    #[test]
    fn test_normalize_path_preserves_regular_path() {
        assert_eq!(normalize_path("/health/ready"), "/health/ready");
    }
}
