//! Server integration tests.
//!
//! These tests drive a real listener over HTTP.

mod common;

use std::time::Duration;

use anyhow::Result;
use limber_server::{GateConfig, MetricsSnapshot, ServerConfig, UserSession};
use limber_session::CacheConfig;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_server_starts_and_responds_to_health() -> Result<()> {
    let server = common::TestServer::start().await?;

    let resp = server.get("/health").send().await?;
    assert!(resp.status().is_success());

    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["status"], "ok");
    assert!(body.get("version").is_some());

    server.stop().await
}

#[tokio::test]
async fn test_register_login_and_track_progress() -> Result<()> {
    let server = common::TestServer::start().await?;

    let token = server.register("alice", "pw1").await?;

    // Cookie from registration resolves to the session
    let resp = server
        .get("/session")
        .header("cookie", format!("session_token={}", token))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let session: UserSession = resp.json().await?;
    assert_eq!(session.username, "alice");

    // A fresh login opens a second, independent session
    let resp = server
        .post("/session")
        .json(&json!({ "username": "alice", "password": "pw1" }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let set_cookie = resp
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(set_cookie.starts_with("session_token="));
    assert!(set_cookie.contains("Max-Age=1800"));
    let body: serde_json::Value = resp.json().await?;
    let second = body["token"].as_str().unwrap_or_default().to_string();
    assert_ne!(second, token);

    for _ in 0..2 {
        let resp = server
            .post("/workout/complete")
            .bearer_auth(&second)
            .send()
            .await?;
        assert_eq!(resp.status(), StatusCode::OK);
    }
    let session: UserSession = server
        .get("/session")
        .bearer_auth(&second)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(session.workouts_completed, 2);

    // The first session is untouched
    let session: UserSession = server
        .get("/session")
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(session.workouts_completed, 0);

    server.stop().await
}

#[tokio::test]
async fn test_credential_failures() -> Result<()> {
    let server = common::TestServer::start().await?;
    server.register("alice", "pw1").await?;

    let resp = server
        .post("/register")
        .json(&json!({ "username": "alice", "password": "pw2" }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = server
        .post("/session")
        .json(&json!({ "username": "alice", "password": "pw2" }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = server
        .post("/session")
        .json(&json!({ "username": "alice", "password": "wrong" }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["code"], "authentication_failed");

    let resp = server
        .post("/session")
        .json(&json!({ "username": "", "password": "pw1" }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    server.stop().await
}

#[tokio::test]
async fn test_logout_ends_session() -> Result<()> {
    let server = common::TestServer::start().await?;
    let token = server.register("alice", "pw1").await?;

    let resp = server.delete("/session").bearer_auth(&token).send().await?;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = server.get("/session").bearer_auth(&token).send().await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    server.stop().await
}

#[tokio::test]
async fn test_capacity_evicts_oldest_session() -> Result<()> {
    let server = common::TestServer::start_with(
        ServerConfig::new().with_request_logging(false),
        GateConfig::default().with_burst(1000),
        CacheConfig::new().with_capacity(2),
    )
    .await?;

    let a = server.register("alice", "pw").await?;
    let b = server.register("bob", "pw").await?;
    let c = server.register("carol", "pw").await?;

    let status = |token: String| {
        let req = server.get("/session").bearer_auth(token);
        async move { req.send().await.map(|r| r.status()) }
    };
    assert_eq!(status(a).await?, StatusCode::UNAUTHORIZED);
    assert_eq!(status(b).await?, StatusCode::OK);
    assert_eq!(status(c).await?, StatusCode::OK);
    assert_eq!(server.state.sessions.len(), 2);

    server.stop().await
}

#[tokio::test]
async fn test_admission_gate_rejects_bursts() -> Result<()> {
    let server = common::TestServer::start_with(
        ServerConfig::new()
            .with_request_logging(false)
            .with_admission_timeout(Duration::from_millis(20)),
        GateConfig::default()
            .with_burst(3)
            .with_period(Duration::from_secs(60)),
        CacheConfig::new(),
    )
    .await?;

    // The readiness probe already spent one token
    let mut statuses = Vec::new();
    for _ in 0..4 {
        statuses.push(server.get("/health").send().await?.status());
    }
    assert_eq!(
        statuses,
        vec![
            StatusCode::OK,
            StatusCode::OK,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::TOO_MANY_REQUESTS,
        ]
    );

    let snapshot: MetricsSnapshot = server.state.metrics_snapshot();
    assert_eq!(snapshot.requests_rejected, 2);
    assert_eq!(snapshot.buffered_tokens, 0);

    server.stop().await
}

#[tokio::test]
async fn test_metrics_endpoint() -> Result<()> {
    let server = common::TestServer::start().await?;
    server.register("alice", "pw1").await?;

    let snapshot: MetricsSnapshot = server.get("/metrics").send().await?.json().await?;
    assert_eq!(snapshot.sessions, 1);
    assert!(snapshot.requests_total >= 2);
    assert!(snapshot.responses_2xx >= 2);
    assert_eq!(snapshot.route_count("POST", "/register", 201), 1);
    assert!(snapshot.route_count("GET", "/health", 200) >= 1);

    server.stop().await
}
