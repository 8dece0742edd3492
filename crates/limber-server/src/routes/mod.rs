//! API routes.

pub mod auth;
pub mod health;
pub mod metrics;
pub mod progress;

pub use auth::{
    CredentialsRequest, SessionResponse, auth_routes, get_session_handler, login_handler,
    logout_handler, register_handler,
};
pub use health::{HealthResponse, HealthStatus, health_routes};
pub use metrics::{metrics_handler, metrics_routes};
pub use progress::{complete_workout_handler, progress_routes};

use axum::http::HeaderMap;

use crate::cookie::extract_session_token;
use crate::error::{Result, ServerError};

/// Token of the caller's session, or 401.
pub(crate) fn require_session_token(headers: &HeaderMap) -> Result<String> {
    extract_session_token(headers)
        .ok_or_else(|| ServerError::Unauthorized("No session token".to_string()))
}
