//! Start command - launches the Limber server.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use limber_auth::CredentialStore;
use limber_server::{AdmissionGate, AppState, GateConfig, Server, ServerConfig};
use limber_session::{CacheConfig, SessionCache};

use super::Context;

/// Arguments for the start command.
///
/// CLI arguments override config file values.
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind to (overrides config)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Directory holding credential records (overrides config)
    #[arg(long)]
    pub auth_dir: Option<PathBuf>,
}

/// Run the start command.
pub async fn run(args: StartArgs, ctx: &Context) -> Result<()> {
    let config = ctx.config();
    let server_section = config.server();
    let session_section = config.session();
    let admission_section = config.admission();

    // ── Resolve settings ────────────────────────────────────────────────

    let bind = args.bind.unwrap_or(server_section.bind.clone());
    let ip: IpAddr = bind
        .parse()
        .with_context(|| format!("Invalid bind address '{}'", bind))?;
    let port = args.port.unwrap_or(server_section.port);
    let bind_address = SocketAddr::new(ip, port);

    let auth_dir = super::auth_dir(ctx, args.auth_dir);

    // ── Build components ────────────────────────────────────────────────

    let credentials = CredentialStore::open(&auth_dir).with_context(|| {
        format!("Failed to open credential store at {}", auth_dir.display())
    })?;

    let cache_config = CacheConfig::new()
        .with_capacity(session_section.capacity)
        .with_absolute_ttl(session_section.absolute_ttl())
        .with_idle_ttl(session_section.idle_ttl())
        .with_sweep_task(session_section.sweep)
        .with_sweep_interval(session_section.sweep_interval());
    let sessions = SessionCache::new(cache_config);

    let background = CancellationToken::new();
    let sweeper = sessions
        .config()
        .enable_sweep_task
        .then(|| sessions.spawn_sweeper(background.child_token()));

    let gate = AdmissionGate::start(
        GateConfig::default()
            .with_burst(admission_section.burst)
            .with_period(admission_section.period()),
    );

    let server_config = ServerConfig::new()
        .with_bind_address(bind_address)
        .with_base_path(server_section.base_path.clone())
        .with_cookie_max_age(server_section.cookie_max_age())
        .with_cookie_secure(server_section.cookie_secure)
        .with_request_logging(server_section.request_logging)
        .with_admission_timeout(admission_section.timeout());

    info!(
        auth_dir = %auth_dir.display(),
        capacity = session_section.capacity,
        burst = admission_section.burst,
        "Limber configured"
    );
    if ctx.verbose {
        for path in ctx.loaded.loaded_from() {
            info!(path = %path.display(), "Config loaded");
        }
    }

    // ── Serve ───────────────────────────────────────────────────────────

    let state = AppState::new(server_config, sessions, credentials, gate.clone());
    let result = Server::from_state(state)
        .run_with_shutdown(shutdown_signal())
        .await;

    // ── Graceful shutdown ───────────────────────────────────────────────

    background.cancel();
    gate.shutdown();
    if let Some(handle) = sweeper
        && let Err(e) = handle.await
    {
        error!(error = %e, "Session sweeper failed");
    }

    result.context("Server failed")?;
    info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl-C.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            // Without a signal handler the server runs until killed
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}
