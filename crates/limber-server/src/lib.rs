//! HTTP API server for Limber.
//!
//! This crate wires the session cache, the credential store and the
//! admission gate into an axum router.
//!
//! # Features
//!
//! - Registration and login backed by [`limber_auth::CredentialStore`]
//! - Cookie (or bearer) sessions kept in a [`limber_session::SessionCache`]
//! - Global token-bucket admission control in front of every route
//! - Request counters and structured request logging
//!
//! # Example
//!
//! ```ignore
//! use limber_server::{AdmissionGate, AppState, GateConfig, Server, ServerConfig};
//!
//! let gate = AdmissionGate::start(GateConfig::default());
//! let state = AppState::new(ServerConfig::default(), sessions, credentials, gate.clone());
//!
//! Server::from_state(state)
//!     .run_with_shutdown(async { let _ = tokio::signal::ctrl_c().await; })
//!     .await?;
//! gate.shutdown();
//! ```

pub mod admission;
pub mod config;
pub mod cookie;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod session;
pub mod state;

pub use admission::{
    Admission, AdmissionControl, AdmissionGate, GateConfig, Requester, admission_middleware,
};
pub use config::ServerConfig;
pub use error::{ErrorResponse, Result, ServerError};
pub use metrics::{
    DurationBucket, MetricsSnapshot, RequestMetrics, RouteCount, instrumentation_middleware,
};
pub use session::UserSession;
pub use state::{AppState, SessionStore};

use std::future::Future;
use std::net::SocketAddr;

use axum::{Router, extract::DefaultBodyLimit, middleware};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// The Limber HTTP server.
pub struct Server {
    /// Application state.
    state: AppState,
}

impl Server {
    /// Create a server from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        let routes = Router::new()
            .merge(routes::health_routes())
            .merge(routes::auth_routes())
            .merge(routes::progress_routes())
            .merge(routes::metrics_routes());

        let routes = match self.state.config.base_path.as_str() {
            "" => routes,
            base_path => Router::new().nest(base_path, routes),
        };

        routes
            // Admission (inner layer, runs after instrumentation has started)
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                admission::admission_middleware,
            ))
            // Counting and request logging (outer layer, sees rejections too)
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                metrics::instrumentation_middleware,
            ))
            .layer(DefaultBodyLimit::max(self.state.config.max_body_size))
            // TraceLayer for detailed HTTP tracing
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the server until the process is stopped.
    pub async fn run(self) -> Result<()> {
        self.run_with_shutdown(std::future::pending()).await
    }

    /// Run the server on the configured address until `signal` resolves.
    pub async fn run_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.state.config.bind_address;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind {}: {}", addr, e)))?;

        self.serve(listener, signal).await
    }

    /// Serve on an already bound listener until `signal` resolves.
    ///
    /// In-flight requests are allowed to finish before this returns.
    pub async fn serve<F>(self, listener: TcpListener, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener
            .local_addr()
            .map_err(|e| ServerError::Internal(format!("Failed to read address: {}", e)))?;
        let router = self.router();

        info!("Starting server on {}", addr);

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(signal)
        .await
        .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;

        info!("Server stopped");
        Ok(())
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.bind_address
    }
}
