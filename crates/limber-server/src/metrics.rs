//! Request counters and structured request logging.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::{
    body::Body,
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Upper bounds of the request duration buckets, in milliseconds.
pub const DURATION_BUCKETS_MS: [u64; 11] =
    [5, 10, 25, 50, 100, 250, 500, 1000, 2500, 5000, 10_000];

/// Route label for requests that matched no route.
pub const UNMATCHED_ROUTE: &str = "<unmatched>";

type RouteKey = (String, String, u16);

/// Process-wide request counters.
#[derive(Debug, Default)]
pub struct RequestMetrics {
    requests_total: AtomicU64,
    requests_rejected: AtomicU64,
    responses_2xx: AtomicU64,
    responses_4xx: AtomicU64,
    responses_5xx: AtomicU64,
    // One slot per bound plus the overflow slot
    durations: [AtomicU64; DURATION_BUCKETS_MS.len() + 1],
    // Keys are route templates, never raw paths, so the map stays small
    routes: Mutex<BTreeMap<RouteKey, u64>>,
}

impl RequestMetrics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a request turned away by the admission gate.
    pub fn record_rejected(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a finished request by route, status and duration.
    pub fn record_response(&self, method: &str, route: &str, status: u16, duration: Duration) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);

        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        let slot = DURATION_BUCKETS_MS
            .iter()
            .position(|&bound| millis <= bound)
            .unwrap_or(DURATION_BUCKETS_MS.len());
        self.durations[slot].fetch_add(1, Ordering::Relaxed);

        *self
            .routes
            .lock()
            .entry((method.to_string(), route.to_string(), status))
            .or_default() += 1;

        let class = match status {
            200..=299 => &self.responses_2xx,
            400..=499 => &self.responses_4xx,
            500..=599 => &self.responses_5xx,
            _ => return,
        };
        class.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters. `sessions` and `buffered_tokens`
    /// are left for the caller to fill in.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut cumulative = 0;
        let request_duration = self
            .durations
            .iter()
            .enumerate()
            .map(|(i, slot)| {
                cumulative += slot.load(Ordering::Relaxed);
                DurationBucket {
                    le_ms: DURATION_BUCKETS_MS.get(i).copied(),
                    count: cumulative,
                }
            })
            .collect();

        let routes = self
            .routes
            .lock()
            .iter()
            .map(|((method, route, status), count)| RouteCount {
                method: method.clone(),
                route: route.clone(),
                status: *status,
                count: *count,
            })
            .collect();

        MetricsSnapshot {
            sessions: 0,
            buffered_tokens: 0,
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_rejected: self.requests_rejected.load(Ordering::Relaxed),
            responses_2xx: self.responses_2xx.load(Ordering::Relaxed),
            responses_4xx: self.responses_4xx.load(Ordering::Relaxed),
            responses_5xx: self.responses_5xx.load(Ordering::Relaxed),
            routes,
            request_duration,
        }
    }
}

/// Requests served for one method, route and status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteCount {
    pub method: String,
    /// Route template, or [`UNMATCHED_ROUTE`].
    pub route: String,
    pub status: u16,
    pub count: u64,
}

/// Cumulative histogram bucket: requests that took at most `le_ms`.
/// The last bucket has no bound and counts every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationBucket {
    pub le_ms: Option<u64>,
    pub count: u64,
}

/// Gauges and counters served by `GET /metrics`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Entries in the session cache, including expired ones not yet reclaimed.
    pub sessions: usize,
    /// Tokens buffered in the admission gate.
    pub buffered_tokens: usize,
    pub requests_total: u64,
    pub requests_rejected: u64,
    pub responses_2xx: u64,
    pub responses_4xx: u64,
    pub responses_5xx: u64,
    /// Per-route counts, sorted by method, route and status.
    pub routes: Vec<RouteCount>,
    pub request_duration: Vec<DurationBucket>,
}

impl MetricsSnapshot {
    /// Requests counted for a method, route and status.
    pub fn route_count(&self, method: &str, route: &str, status: u16) -> u64 {
        self.routes
            .iter()
            .find(|r| r.method == method && r.route == route && r.status == status)
            .map_or(0, |r| r.count)
    }
}

/// Counting and request logging middleware.
///
/// Wraps the admission gate, so rejected requests are counted and logged
/// like any other.
pub async fn instrumentation_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| UNMATCHED_ROUTE.to_string(), |p| p.as_str().to_string());

    let start = std::time::Instant::now();

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();
    state
        .metrics
        .record_response(method.as_str(), &route, status.as_u16(), duration);

    if !state.config.request_logging {
        return response;
    }

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        tracing::info!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Request completed"
        );
    }

    response
}
