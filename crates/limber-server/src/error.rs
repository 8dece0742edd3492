//! Error types for the server.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use limber_auth::CredentialError;

/// Server error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// No valid session, or unknown user at login.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Wrong password for an existing user.
    #[error("Authentication failed for '{0}'")]
    AuthenticationFailed(String),

    /// Username already registered.
    #[error("User '{0}' already exists")]
    Conflict(String),

    /// Bad request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Admission gate timed out.
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Credential storage or hashing failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CredentialError> for ServerError {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::NotFound(username) => {
                ServerError::Unauthorized(format!("Unknown user '{}'", username))
            }
            CredentialError::AlreadyExists(username) => ServerError::Conflict(username),
            CredentialError::AuthenticationFailed(username) => {
                ServerError::AuthenticationFailed(username)
            }
            CredentialError::InvalidUsername { username, reason } => {
                ServerError::BadRequest(format!("Username '{}' {}", username, reason))
            }
            e @ CredentialError::Storage { .. } => ServerError::Storage(e.to_string()),
            CredentialError::Kdf(msg) | CredentialError::Task(msg) => ServerError::Internal(msg),
        }
    }
}

impl From<limber_session::Error> for ServerError {
    fn from(e: limber_session::Error) -> Self {
        match e {
            limber_session::Error::NotFound(_) => {
                ServerError::Unauthorized("No valid session".to_string())
            }
            e @ limber_session::Error::CapacityExhausted { .. } => {
                ServerError::Internal(e.to_string())
            }
        }
    }
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ServerError {
    /// HTTP status and machine-readable code.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ServerError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ServerError::AuthenticationFailed(_) => {
                (StatusCode::UNAUTHORIZED, "authentication_failed")
            }
            ServerError::Conflict(_) => (StatusCode::CONFLICT, "already_exists"),
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ServerError::RateLimitExceeded => {
                (StatusCode::TOO_MANY_REQUESTS, "rate_limit_exceeded")
            }
            ServerError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            ServerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = %status, code, error = %message, "Server error");
        } else {
            tracing::warn!(status = %status, code, error = %message, "Client error");
        }

        let body = ErrorResponse {
            code: code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_credential_error_mapping() {
        let cases = [
            (CredentialError::NotFound("bob".into()), StatusCode::UNAUTHORIZED, "unauthorized"),
            (
                CredentialError::AlreadyExists("alice".into()),
                StatusCode::CONFLICT,
                "already_exists",
            ),
            (
                CredentialError::AuthenticationFailed("alice".into()),
                StatusCode::UNAUTHORIZED,
                "authentication_failed",
            ),
            (
                CredentialError::InvalidUsername {
                    username: "../x".into(),
                    reason: "must not start with '.'",
                },
                StatusCode::BAD_REQUEST,
                "bad_request",
            ),
            (
                CredentialError::Storage {
                    path: PathBuf::from("/tmp/auth/alice"),
                    source: std::io::Error::other("disk full"),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
            ),
            (
                CredentialError::Kdf("bad params".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
            ),
        ];

        for (err, status, code) in cases {
            let mapped = ServerError::from(err);
            assert_eq!(mapped.status_and_code(), (status, code), "{mapped}");
        }
    }

    #[test]
    fn test_session_error_mapping() {
        let err = ServerError::from(limber_session::Error::NotFound("tok".into()));
        assert_eq!(err.status_and_code().0, StatusCode::UNAUTHORIZED);

        let err = ServerError::from(limber_session::Error::CapacityExhausted { capacity: 1 });
        assert_eq!(err.status_and_code().0, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_error_response_body() {
        let response = ServerError::RateLimitExceeded.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.code, "rate_limit_exceeded");
        assert_eq!(body.message, "Rate limit exceeded");
    }
}
