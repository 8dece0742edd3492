//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [server]                 # listener, base path, cookies
//! [session]                # session cache capacity and lifetimes
//! [admission]              # global token bucket
//! [auth]                   # credential directory
//! [logging]                # console / file logging
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged. Use the accessors to read a section
/// with defaults applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LimberConfig {
    /// HTTP server settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,

    /// Session cache settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionConfig>,

    /// Admission gate settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admission: Option<AdmissionConfig>,

    /// Credential store settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,

    /// Logging settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

impl LimberConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections are replaced whole, not field by field.
    pub fn merge(&mut self, other: LimberConfig) {
        if other.server.is_some() {
            self.server = other.server;
        }

        if other.session.is_some() {
            self.session = other.session;
        }

        if other.admission.is_some() {
            self.admission = other.admission;
        }

        if other.auth.is_some() {
            self.auth = other.auth;
        }

        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// Server section with defaults applied.
    pub fn server(&self) -> ServerConfig {
        self.server.clone().unwrap_or_default()
    }

    /// Session section with defaults applied.
    pub fn session(&self) -> SessionConfig {
        self.session.clone().unwrap_or_default()
    }

    /// Admission section with defaults applied.
    pub fn admission(&self) -> AdmissionConfig {
        self.admission.clone().unwrap_or_default()
    }

    /// Auth section with defaults applied.
    pub fn auth(&self) -> AuthConfig {
        self.auth.clone().unwrap_or_default()
    }

    /// Logging section with defaults applied.
    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }

    /// A copy with every section present, for display.
    pub fn with_defaults(&self) -> Self {
        Self {
            server: Some(self.server()),
            session: Some(self.session()),
            admission: Some(self.admission()),
            auth: Some(self.auth()),
            logging: Some(self.logging()),
        }
    }

    /// Check every section for values the runtime cannot honour.
    pub fn validate(&self) -> Result<()> {
        self.server().validate()?;
        self.session().validate()?;
        self.admission().validate()?;
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Server configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind: String,
    /// Port to listen on.
    pub port: u16,
    /// Prefix for every route. Empty, or starts with `/` and does not end
    /// with one.
    pub base_path: String,
    /// Lifetime of the session cookie, in seconds. Capped at the session
    /// absolute TTL.
    pub cookie_max_age_secs: u64,
    /// Add the `Secure` attribute to the session cookie.
    pub cookie_secure: bool,
    /// Enable request logging.
    pub request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8080,
            base_path: String::new(),
            cookie_max_age_secs: 1800,
            cookie_secure: false,
            request_logging: true,
        }
    }
}

impl ServerConfig {
    /// Cookie lifetime as a duration.
    pub fn cookie_max_age(&self) -> Duration {
        Duration::from_secs(self.cookie_max_age_secs)
    }

    fn validate(&self) -> Result<()> {
        let bp = &self.base_path;
        if !bp.is_empty() && (!bp.starts_with('/') || bp.ends_with('/')) {
            return Err(invalid(
                "server.base_path",
                format!("'{bp}' must start with '/' and must not end with '/'"),
            ));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Session cache configuration.
///
/// ```toml
/// [session]
/// capacity = 50
/// absolute_ttl_secs = 2592000
/// idle_ttl_secs = 3600
/// sweep = true
/// sweep_interval_secs = 60
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum number of live sessions.
    pub capacity: usize,
    /// Maximum session lifetime in seconds.
    pub absolute_ttl_secs: u64,
    /// Maximum inactivity in seconds.
    pub idle_ttl_secs: u64,
    /// Run the background sweeper.
    pub sweep: bool,
    /// Seconds between sweeps.
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capacity: 50,
            absolute_ttl_secs: 30 * 24 * 60 * 60,
            idle_ttl_secs: 60 * 60,
            sweep: true,
            sweep_interval_secs: 60,
        }
    }
}

impl SessionConfig {
    /// Absolute TTL as a duration.
    pub fn absolute_ttl(&self) -> Duration {
        Duration::from_secs(self.absolute_ttl_secs)
    }

    /// Idle TTL as a duration.
    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }

    /// Sweep interval as a duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(invalid("session.capacity", "must be at least 1"));
        }
        if self.absolute_ttl_secs == 0 {
            return Err(invalid("session.absolute_ttl_secs", "must be positive"));
        }
        if self.idle_ttl_secs == 0 {
            return Err(invalid("session.idle_ttl_secs", "must be positive"));
        }
        if self.sweep && self.sweep_interval_secs == 0 {
            return Err(invalid("session.sweep_interval_secs", "must be positive"));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Admission Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Admission gate (global token bucket) configuration.
///
/// ```toml
/// [admission]
/// burst = 10
/// period_ms = 100
/// timeout_ms = 2000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Bucket size: requests admitted back to back.
    pub burst: usize,
    /// Milliseconds between refills of one token.
    pub period_ms: u64,
    /// Milliseconds a request may wait for a token.
    pub timeout_ms: u64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            burst: 10,
            period_ms: 100,
            timeout_ms: 2000,
        }
    }
}

impl AdmissionConfig {
    /// Refill period as a duration.
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    /// Wait timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.burst == 0 {
            return Err(invalid("admission.burst", "must be at least 1"));
        }
        if self.period_ms == 0 {
            return Err(invalid("admission.period_ms", "must be positive"));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Credential store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Directory holding one credential file per user.
    pub directory: PathBuf,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(".limber/auth"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Logging configuration section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Suppress console output.
    pub quiet: bool,
    /// Directory for daily-rotated JSON log files. Unset disables file
    /// logging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}
