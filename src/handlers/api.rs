use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{Value, json};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::state::AppState;

/// Health check handler
/// Returns a simple JSON response indicating the server is running
pub async fn health_check() -> Result<Json<Value>, StatusCode> {
    Ok(Json(json!({
        "status": "OK"
    })))
}

/// Health report handler
///
/// Returns the rolling performance snapshot for every monitoring scope, the
/// currently raised alerts, and live counters for sessions, cache and the
/// provider permit pool.
pub async fn health_report(State(state): State<Arc<AppState>>) -> Json<Value> {
    let core = &state.core_state;
    let (hits, misses, sets, deletes) = core.cache.metrics().get_stats();
    let limiter = core.limiter.metrics();
    let active_alerts = core.monitor.active_alerts();

    Json(json!({
        "status": if active_alerts.is_empty() { "OK" } else { "DEGRADED" },
        "provider": core.provider.get_provider_info(),
        "windows": core.monitor.snapshots(),
        "alerts": active_alerts,
        "provider_attempts": core.monitor.provider_attempts(),
        "sessions": {
            "active": core.sessions.active_count(),
        },
        "cache": {
            "backend": core.cache.backend_type(),
            "entries": core.cache.entry_count(),
            "hits": hits,
            "misses": misses,
            "sets": sets,
            "deletes": deletes,
        },
        "limiter": {
            "max_concurrent": core.limiter.max_concurrent(),
            "in_flight": core.limiter.in_flight(),
            "peak_in_flight": core.limiter.peak_in_flight(),
            "total_acquired": limiter.total_acquired.load(Ordering::Relaxed),
        },
        "jobs": core.jobs.len(),
    }))
}
