//! CLI command handlers.

pub mod config;
pub mod start;
pub mod user;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use limber_config::{LimberConfig, LoadedConfig, discovery::ConfigSource};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Configuration after layering and validation.
    pub loaded: LoadedConfig,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// The merged configuration.
    pub fn config(&self) -> &LimberConfig {
        &self.loaded.config
    }
}

/// Load the explicit config file if one was given, otherwise discover and
/// merge the user and project layers.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let Some(path) = explicit else {
        return limber_config::load_config(None).context("Failed to load configuration");
    };

    let config = limber_config::load_config_file(path)
        .with_context(|| format!("Failed to load config file {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid config file {}", path.display()))?;

    Ok(LoadedConfig {
        config,
        sources: vec![ConfigSource {
            path: path.to_path_buf(),
            loaded: true,
        }],
        warnings: Vec::new(),
    })
}

/// Credential directory: the CLI override, or the configured one.
pub fn auth_dir(ctx: &Context, overridden: Option<PathBuf>) -> PathBuf {
    overridden.unwrap_or_else(|| ctx.config().auth().directory)
}
