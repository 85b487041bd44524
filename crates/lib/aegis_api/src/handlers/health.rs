//! Liveness endpoint.

use axum::Json;
use axum::extract::State;

use aegis_core::clock::Clock;

use crate::AppState;
use crate::models::HealthResponse;

/// `GET /health` — unauthenticated, exempt from rate limiting.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let now = state.clock.now();
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: now,
        uptime_secs: (now - state.started_at).num_seconds(),
    })
}
