//! Global admission control.
//!
//! A token bucket holding at most `burst` tokens. The bucket starts full and a
//! single producer task adds one token every `period` while it is below
//! capacity. Each admitted request consumes one token; a request that cannot
//! get a token within its timeout is rejected.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ServerError;
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Default bucket size.
pub const DEFAULT_BURST: usize = 10;

/// Default refill period.
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(100);

/// Default time a request may wait for a token.
pub const DEFAULT_ADMISSION_TIMEOUT: Duration = Duration::from_secs(2);

/// Token bucket parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateConfig {
    /// Maximum number of buffered tokens.
    pub burst: usize,
    /// Interval between refills of one token.
    pub period: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            burst: DEFAULT_BURST,
            period: DEFAULT_PERIOD,
        }
    }
}

impl GateConfig {
    /// Set the bucket size.
    pub fn with_burst(mut self, burst: usize) -> Self {
        self.burst = burst;
        self
    }

    /// Set the refill period.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }
}

/// Outcome of an admission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A token was consumed; the request may proceed.
    Admitted,
    /// No token became available in time.
    Rejected,
}

impl Admission {
    /// Whether the request may proceed.
    pub fn is_admitted(self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

/// Who is asking to be admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requester {
    /// Peer address unknown.
    Anonymous,
    /// Remote socket address of the connection.
    Peer(SocketAddr),
}

/// Admission policy used by the HTTP pipeline.
///
/// The global gate ignores the requester; a per-identity limiter can key on
/// it without changing callers.
#[async_trait]
pub trait AdmissionControl: Send + Sync {
    /// Wait up to `timeout` for permission to proceed.
    async fn admit(&self, requester: &Requester, timeout: Duration) -> Admission;

    /// Tokens currently buffered.
    fn buffered_tokens(&self) -> usize;

    /// Whether the policy is still replenishing. A closed policy only
    /// drains what it already holds.
    fn is_open(&self) -> bool {
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Gate
// ─────────────────────────────────────────────────────────────────────────────

/// Global token bucket shared by every request.
#[derive(Debug)]
pub struct AdmissionGate {
    tokens: Arc<Semaphore>,
    config: GateConfig,
    cancel: CancellationToken,
    producer: Mutex<Option<JoinHandle<()>>>,
}

impl AdmissionGate {
    /// Create a full bucket and start its producer.
    ///
    /// Must be called from within a Tokio runtime. `burst` and `period` are
    /// clamped to at least 1 and 1ms.
    pub fn start(config: GateConfig) -> Arc<Self> {
        let config = GateConfig {
            burst: config.burst.max(1),
            period: config.period.max(Duration::from_millis(1)),
        };
        let tokens = Arc::new(Semaphore::new(config.burst));
        let cancel = CancellationToken::new();

        let producer = spawn_producer(Arc::clone(&tokens), config, cancel.clone());
        info!(
            burst = config.burst,
            period_ms = config.period.as_millis() as u64,
            "Admission gate started"
        );

        Arc::new(Self {
            tokens,
            config,
            cancel,
            producer: Mutex::new(Some(producer)),
        })
    }

    /// Effective bucket parameters.
    pub fn config(&self) -> GateConfig {
        self.config
    }

    /// Stop refilling the bucket.
    ///
    /// Callers already waiting are not woken; they are admitted if a token
    /// remains, otherwise they time out. Idempotent.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        if self.producer.lock().take().is_some() {
            info!("Admission gate stopped");
        }
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for AdmissionGate {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[async_trait]
impl AdmissionControl for AdmissionGate {
    async fn admit(&self, requester: &Requester, timeout: Duration) -> Admission {
        match tokio::time::timeout(timeout, self.tokens.acquire()).await {
            Ok(Ok(permit)) => {
                // Tokens are consumed, never handed back
                permit.forget();
                Admission::Admitted
            }
            Ok(Err(_closed)) => Admission::Rejected,
            Err(_elapsed) => {
                debug!(?requester, "Admission timed out");
                Admission::Rejected
            }
        }
    }

    fn buffered_tokens(&self) -> usize {
        self.tokens.available_permits()
    }

    fn is_open(&self) -> bool {
        !self.is_shut_down()
    }
}

fn spawn_producer(
    tokens: Arc<Semaphore>,
    config: GateConfig,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let Some(first_tick) = Instant::now().checked_add(config.period) else {
        warn!(period = ?config.period, "Refill period out of range, bucket will not refill");
        return tokio::spawn(async move { cancel.cancelled().await });
    };
    let mut ticker = interval_at(first_tick, config.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    // Sole producer: nothing else can add between check and add
                    if tokens.available_permits() < config.burst {
                        tokens.add_permits(1);
                    }
                }
            }
        }
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Middleware
// ─────────────────────────────────────────────────────────────────────────────

/// Admission middleware.
///
/// Every request must get a token from the gate before the handler runs.
/// Requests that time out get `429 Too Many Requests`.
pub async fn admission_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let requester = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| Requester::Peer(*addr))
        .unwrap_or(Requester::Anonymous);

    let admission = state
        .gate
        .admit(&requester, state.config.admission_timeout)
        .await;

    if admission.is_admitted() {
        return next.run(request).await;
    }

    state.metrics.record_rejected();
    warn!(
        ?requester,
        path = %request.uri().path(),
        "Admission rejected"
    );
    ServerError::RateLimitExceeded.into_response()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_secs(2);

    fn gate(burst: usize, period_ms: u64) -> Arc<AdmissionGate> {
        AdmissionGate::start(
            GateConfig::default()
                .with_burst(burst)
                .with_period(Duration::from_millis(period_ms)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_then_one_per_period() {
        let gate = gate(10, 100);
        let start = Instant::now();

        for _ in 0..10 {
            assert_eq!(gate.admit(&Requester::Anonymous, WAIT).await, Admission::Admitted);
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(gate.buffered_tokens(), 0);

        assert_eq!(gate.admit(&Requester::Anonymous, WAIT).await, Admission::Admitted);
        assert_eq!(start.elapsed(), Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_run_rate() {
        let gate = gate(2, 100);
        let start = Instant::now();

        for _ in 0..12 {
            assert!(gate.admit(&Requester::Anonymous, WAIT).await.is_admitted());
        }

        // Two from the initial burst, then one per period
        assert_eq!(start.elapsed(), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejects_after_timeout() {
        let gate = gate(1, 10_000);
        let start = Instant::now();

        assert!(gate.admit(&Requester::Anonymous, WAIT).await.is_admitted());
        assert_eq!(gate.admit(&Requester::Anonymous, WAIT).await, Admission::Rejected);
        assert_eq!(start.elapsed(), WAIT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bucket_never_exceeds_burst() {
        let gate = gate(3, 100);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(gate.buffered_tokens(), 3);

        assert!(gate.admit(&Requester::Anonymous, WAIT).await.is_admitted());
        assert_eq!(gate.buffered_tokens(), 2);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(gate.buffered_tokens(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_requester_is_ignored_by_global_gate() {
        let gate = gate(1, 10_000);
        let peer = Requester::Peer("10.0.0.1:4000".parse().unwrap());
        let other = Requester::Peer("10.0.0.2:4000".parse().unwrap());

        assert!(gate.admit(&peer, WAIT).await.is_admitted());
        assert_eq!(gate.admit(&other, Duration::from_millis(50)).await, Admission::Rejected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_waiters_share_tokens() {
        let gate = gate(2, 100);

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let gate = Arc::clone(&gate);
                tokio::spawn(async move { gate.admit(&Requester::Anonymous, WAIT).await })
            })
            .collect();

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap().is_admitted() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 6);
        assert_eq!(gate.buffered_tokens(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_burst_then_wait_for_refill() {
        let gate = AdmissionGate::start(GateConfig::default());
        let start = Instant::now();

        let handles: Vec<_> = (0..11)
            .map(|_| {
                let gate = Arc::clone(&gate);
                tokio::spawn(async move {
                    let admission = gate
                        .admit(&Requester::Anonymous, DEFAULT_ADMISSION_TIMEOUT)
                        .await;
                    (admission, start.elapsed())
                })
            })
            .collect();

        let mut waited = Vec::new();
        for handle in handles {
            let (admission, elapsed) = handle.await.unwrap();
            assert_eq!(admission, Admission::Admitted);
            waited.push(elapsed);
        }
        waited.sort();

        // Ten ride the initial burst, the eleventh waits for one refill
        assert_eq!(waited[..10], [Duration::ZERO; 10]);
        assert_eq!(waited[10], Duration::from_millis(100));
        assert_eq!(gate.buffered_tokens(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_refill_without_hanging_waiters() {
        let gate = gate(1, 100);
        assert!(gate.admit(&Requester::Anonymous, WAIT).await.is_admitted());

        assert!(gate.is_open());
        gate.shutdown();
        gate.shutdown();
        assert!(gate.is_shut_down());
        assert!(!gate.is_open());

        let start = Instant::now();
        assert_eq!(gate.admit(&Requester::Anonymous, WAIT).await, Admission::Rejected);
        assert_eq!(start.elapsed(), WAIT);
        assert_eq!(gate.buffered_tokens(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_config_is_clamped() {
        let gate = AdmissionGate::start(GateConfig {
            burst: 0,
            period: Duration::ZERO,
        });
        assert_eq!(gate.config().burst, 1);
        assert_eq!(gate.config().period, Duration::from_millis(1));
        assert_eq!(gate.buffered_tokens(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_range_period_never_refills() {
        let gate = AdmissionGate::start(
            GateConfig::default()
                .with_burst(1)
                .with_period(Duration::MAX),
        );
        assert!(gate.admit(&Requester::Anonymous, WAIT).await.is_admitted());
        assert_eq!(gate.admit(&Requester::Anonymous, WAIT).await, Admission::Rejected);
        assert_eq!(gate.buffered_tokens(), 0);
        gate.shutdown();
    }
}
