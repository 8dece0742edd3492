//! Metrics endpoint.

use axum::{Json, Router, extract::State, routing::get};

use crate::metrics::MetricsSnapshot;
use crate::state::AppState;

/// `GET /metrics`: session and admission gauges plus request counters.
pub async fn metrics_handler(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics_snapshot())
}

/// Create metrics routes.
pub fn metrics_routes() -> Router<AppState> {
    Router::new().route("/metrics", get(metrics_handler))
}
