//! Workout progress endpoints.

use axum::{
    Json, Router,
    extract::State,
    http::HeaderMap,
    routing::post,
};
use chrono::Utc;
use tracing::debug;

use crate::error::Result;
use crate::routes::require_session_token;
use crate::session::UserSession;
use crate::state::AppState;

/// `POST /workout/complete`: record a finished workout on the caller's
/// session and return the updated session.
pub async fn complete_workout_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserSession>> {
    let token = require_session_token(&headers)?;
    let session = state.sessions.with_mut(&token, |session| {
        session.complete_workout(Utc::now());
        session.clone()
    })?;

    debug!(
        username = %session.username,
        workouts = session.workouts_completed,
        "Workout completed"
    );
    Ok(Json(session))
}

/// Create workout progress routes.
pub fn progress_routes() -> Router<AppState> {
    Router::new().route("/workout/complete", post(complete_workout_handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::test_router;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn complete(token: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/workout/complete")
            .header("cookie", format!("session_token={}", token))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_complete_workout_updates_session() {
        let (_dir, state, app) = test_router();
        let token = state.open_session("alice").unwrap();

        for expected in 1..=3 {
            let response = app.clone().oneshot(complete(token.as_str())).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);

            let body = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let session: UserSession = serde_json::from_slice(&body).unwrap();
            assert_eq!(session.workouts_completed, expected);
            assert!(session.last_workout_at.is_some());
        }

        assert_eq!(
            state.sessions.get(token.as_str()).unwrap().workouts_completed,
            3
        );
    }

    #[tokio::test]
    async fn test_complete_workout_requires_session() {
        let (_dir, _state, app) = test_router();

        let response = app.oneshot(complete("missing")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
