//! Liveness and readiness.
//!
//! `GET /health` reports `degraded` with `503` once the admission gate has
//! stopped refilling or the credential directory has gone missing, so a
//! proxy can take the instance out of rotation before logins start failing.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Overall service condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Ok,
    Degraded,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    /// Entries in the session cache.
    pub sessions: usize,
    pub session_capacity: usize,
    /// The admission gate is still replenishing tokens.
    pub admission_open: bool,
    /// The credential directory exists.
    pub credentials_ready: bool,
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let admission_open = state.gate.is_open();
    let credentials_ready = state.credentials.is_ready();

    let (code, status) = if admission_open && credentials_ready {
        (StatusCode::OK, HealthStatus::Ok)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, HealthStatus::Degraded)
    };

    let stats = state.sessions.stats();
    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            sessions: stats.size,
            session_capacity: stats.capacity,
            admission_open,
            credentials_ready,
        }),
    )
}

/// Create health check routes.
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
