//! Application state shared across handlers.

use std::sync::Arc;

use limber_auth::CredentialStore;
use limber_session::{SessionCache, SessionToken};
use tracing::debug;

use crate::admission::AdmissionControl;
use crate::config::ServerConfig;
use crate::error::Result;
use crate::metrics::{MetricsSnapshot, RequestMetrics};
use crate::session::UserSession;

/// Session cache holding logged-in users.
pub type SessionStore = SessionCache<UserSession>;

/// Application state shared across all handlers.
///
/// Every component is built by the caller and injected here; the server
/// owns no globals.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// Live sessions keyed by token.
    pub sessions: SessionStore,

    /// Registered credentials.
    pub credentials: CredentialStore,

    /// Admission policy applied to every request.
    pub gate: Arc<dyn AdmissionControl>,

    /// Request counters.
    pub metrics: Arc<RequestMetrics>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        config: ServerConfig,
        sessions: SessionStore,
        credentials: CredentialStore,
        gate: Arc<dyn AdmissionControl>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            sessions,
            credentials,
            gate,
            metrics: Arc::new(RequestMetrics::new()),
        }
    }

    /// Start a session for an authenticated user and return its token.
    pub fn open_session(&self, username: &str) -> Result<SessionToken> {
        let token = SessionToken::generate();
        self.sessions
            .put(token.as_str(), UserSession::new(username))?;
        debug!(username = %username, "Session opened");
        Ok(token)
    }

    /// Cookie lifetime, never longer than the session itself can live.
    pub fn cookie_max_age(&self) -> std::time::Duration {
        self.config
            .cookie_max_age
            .min(self.sessions.policy().absolute_ttl)
    }

    /// Current gauges and counters.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sessions: self.sessions.len(),
            buffered_tokens: self.gate.buffered_tokens(),
            ..self.metrics.snapshot()
        }
    }
}
