//! Limber - fitness tracking backend
//!
//! Main entry point for the Limber CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;

mod commands;

use commands::{config, start, user};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Limber - fitness tracking backend
#[derive(Parser)]
#[command(name = "limber")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file (skips discovery)
    #[arg(long, global = true, env = "LIMBER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the Limber server
    Start(start::StartArgs),

    /// Show the effective configuration
    Config(config::ConfigArgs),

    /// Manage local user credentials
    User(user::UserArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = commands::load_config(cli.config.as_deref())?;
    let _guard = init_tracing(&loaded.config.logging(), cli.verbose)?;

    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }

    let ctx = commands::Context {
        loaded,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Start(args) => start::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
        Commands::User(args) => user::run(args, &ctx).await,
    }
}

/// Install the tracing subscriber: human-readable console output on stderr
/// plus, when a log directory is configured, daily-rotated JSON files.
fn init_tracing(
    logging: &limber_config::LoggingConfig,
    verbose: bool,
) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{EnvFilter, prelude::*};

    let filter = if verbose {
        "limber=debug,limber_server=debug,limber_session=debug,limber_auth=debug,limber_config=debug,tower_http=debug,info"
    } else {
        "limber=info,limber_server=info,limber_session=info,limber_auth=info,warn"
    };
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let console = (!logging.quiet).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
    });

    let (file, guard) = match &logging.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = tracing_appender::rolling::daily(dir, "limber.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(EnvFilter::new(
                    "limber=trace,limber_server=trace,limber_session=trace,limber_auth=trace,limber_config=trace,info",
                ));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .init();

    Ok(guard)
}
