//! Registration, login and session endpoints.
//!
//! A successful register or login opens a session and hands its token back
//! both in the `session_token` cookie and in the body.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cookie::{clear_session_cookie, extract_session_token, session_cookie};
use crate::error::{Result, ServerError};
use crate::routes::require_session_token;
use crate::session::UserSession;
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Request/Response Types
// ─────────────────────────────────────────────────────────────────────────────

/// Body of register and login requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl CredentialsRequest {
    fn validated(self) -> Result<Self> {
        if self.username.is_empty() || self.password.is_empty() {
            return Err(ServerError::BadRequest(
                "username and password are required".to_string(),
            ));
        }
        Ok(self)
    }
}

/// Body returned when a session is opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    /// Authenticated username.
    pub username: String,
    /// Session token, for clients that send it as a bearer token.
    pub token: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `POST /register`: create an account and log it in.
pub async fn register_handler(
    State(state): State<AppState>,
    body: std::result::Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Response> {
    let request = parse_credentials(body)?;

    state
        .credentials
        .register(&request.username, &request.password)
        .await?;
    info!(username = %request.username, "User registered");

    open_session_response(&state, request.username, StatusCode::CREATED)
}

/// `POST /session`: log in with a username and password.
pub async fn login_handler(
    State(state): State<AppState>,
    body: std::result::Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Response> {
    let request = parse_credentials(body)?;

    state
        .credentials
        .verify(&request.username, &request.password)
        .await?;
    info!(username = %request.username, "User logged in");

    open_session_response(&state, request.username, StatusCode::OK)
}

/// `GET /session`: the caller's session.
pub async fn get_session_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserSession>> {
    let token = require_session_token(&headers)?;
    let session = state.sessions.get(&token)?;
    Ok(Json(session))
}

/// `DELETE /session`: log out. The cookie is cleared even when no session
/// was found.
pub async fn logout_handler(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = extract_session_token(&headers)
        && let Some(session) = state.sessions.remove(&token)
    {
        info!(username = %session.username, "User logged out");
    }

    (
        StatusCode::NO_CONTENT,
        [(SET_COOKIE, clear_session_cookie(state.config.cookie_secure))],
    )
}

fn parse_credentials(
    body: std::result::Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<CredentialsRequest> {
    let Json(request) = body.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    request.validated()
}

fn open_session_response(
    state: &AppState,
    username: String,
    status: StatusCode,
) -> Result<Response> {
    let token = state.open_session(&username)?;
    let cookie = session_cookie(
        token.as_str(),
        state.cookie_max_age(),
        state.config.cookie_secure,
    )
    .map_err(|e| ServerError::Internal(format!("Invalid session cookie: {}", e)))?;

    Ok((
        status,
        [(SET_COOKIE, cookie)],
        Json(SessionResponse {
            username,
            token: token.into_string(),
        }),
    )
        .into_response())
}

/// Create registration and session routes.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register_handler))
        .route(
            "/session",
            post(login_handler)
                .get(get_session_handler)
                .delete(logout_handler),
        )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
