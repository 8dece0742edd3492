//! Configuration system for Limber.
//!
//! Provides TOML-based configuration with:
//! - `[server]`, `[session]`, `[admission]`, `[auth]` and `[logging]` sections
//! - Config file layering (user config dir + project-local overrides)
//! - Validation of limits before anything is constructed from them

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    LoadedConfig, load_config, load_config_file, load_config_with_options, xdg_config_dir,
    xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
