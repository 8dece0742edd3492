//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use limber_auth::{CredentialStore, KdfParams};
use limber_server::{AdmissionGate, AppState, GateConfig, Server, ServerConfig};
use limber_session::{CacheConfig, SessionCache};

/// Cheap hashing so tests stay fast.
const TEST_KDF: KdfParams = KdfParams {
    passes: 1,
    memory_kib: 64,
    parallelism: 1,
};

/// A test server that runs in the background.
pub struct TestServer {
    /// The server's address.
    pub addr: SocketAddr,
    /// HTTP client configured for this server.
    pub client: Client,
    /// Shared state, for inspecting the server from tests.
    pub state: AppState,
    /// The admission gate behind `state.gate`.
    pub gate: Arc<AdmissionGate>,
    /// Stops the server when cancelled.
    shutdown: CancellationToken,
    /// Handle to the server task.
    handle: JoinHandle<()>,
    /// Temporary directory for credential records.
    pub temp_dir: TempDir,
}

impl TestServer {
    /// Start a new test server with a roomy admission gate.
    pub async fn start() -> Result<Self> {
        Self::start_with(
            ServerConfig::new().with_request_logging(false),
            GateConfig::default().with_burst(1000),
            CacheConfig::new(),
        )
        .await
    }

    /// Start a new test server with explicit settings.
    pub async fn start_with(
        config: ServerConfig,
        gate_config: GateConfig,
        cache_config: CacheConfig,
    ) -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let credentials =
            CredentialStore::open_with_params(temp_dir.path().join("auth"), TEST_KDF)?;
        let gate = AdmissionGate::start(gate_config);
        let state = AppState::new(
            config,
            SessionCache::new(cache_config),
            credentials,
            gate.clone(),
        );

        // Bind first so the port is ours before the server task starts
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let shutdown = CancellationToken::new();
        let server = Server::from_state(state.clone());
        let signal = shutdown.clone();
        let handle = tokio::spawn(async move {
            let _ = server
                .serve(listener, async move { signal.cancelled().await })
                .await;
        });

        let client = Client::new();
        wait_for_server(&client, addr).await?;

        Ok(Self {
            addr,
            client,
            state,
            gate,
            shutdown,
            handle,
            temp_dir,
        })
    }

    /// Get the base URL for the server.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get a GET request builder.
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.get(format!("{}{}", self.base_url(), path))
    }

    /// Get a POST request builder.
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.post(format!("{}{}", self.base_url(), path))
    }

    /// Get a DELETE request builder.
    pub fn delete(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.delete(format!("{}{}", self.base_url(), path))
    }

    /// Register a user and return the session token.
    pub async fn register(&self, username: &str, password: &str) -> Result<String> {
        let resp = self
            .post("/register")
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await?
            .error_for_status()?;
        let body: serde_json::Value = resp.json().await?;
        body["token"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("register response has no token"))
    }

    /// Stop the server and wait for it to finish.
    pub async fn stop(self) -> Result<()> {
        self.shutdown.cancel();
        self.gate.shutdown();
        timeout(Duration::from_secs(5), self.handle).await??;
        Ok(())
    }
}

/// Wait for the server to become ready.
async fn wait_for_server(client: &Client, addr: SocketAddr) -> Result<()> {
    let url = format!("http://{}/health", addr);

    let result = timeout(Duration::from_secs(5), async {
        loop {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return,
                _ => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    })
    .await;

    match result {
        Ok(()) => Ok(()),
        Err(_) => anyhow::bail!("Timeout waiting for server to start"),
    }
}
