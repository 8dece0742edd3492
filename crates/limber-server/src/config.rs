//! Server configuration.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::admission::DEFAULT_ADMISSION_TIMEOUT;

/// Default session cookie lifetime (30 minutes).
pub const DEFAULT_COOKIE_MAX_AGE: Duration = Duration::from_secs(30 * 60);

/// Default max body size for REST requests (16 KiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 16 * 1024;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_address: SocketAddr,

    /// Prefix for every route; empty serves at the root.
    pub base_path: String,

    /// `Max-Age` of the session cookie.
    pub cookie_max_age: Duration,

    /// Add the `Secure` attribute to the session cookie.
    pub cookie_secure: bool,

    /// Enable request logging.
    pub request_logging: bool,

    /// How long a request may wait at the admission gate.
    pub admission_timeout: Duration,

    /// Maximum REST request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            base_path: String::new(),
            cookie_max_age: DEFAULT_COOKIE_MAX_AGE,
            cookie_secure: false,
            request_logging: true,
            admission_timeout: DEFAULT_ADMISSION_TIMEOUT,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl ServerConfig {
    /// Create a server config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bind address.
    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    /// Set the route prefix.
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Set the session cookie lifetime.
    pub fn with_cookie_max_age(mut self, max_age: Duration) -> Self {
        self.cookie_max_age = max_age;
        self
    }

    /// Mark the session cookie `Secure`.
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    /// Enable or disable request logging.
    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.request_logging = enabled;
        self
    }

    /// Set the admission wait timeout.
    pub fn with_admission_timeout(mut self, timeout: Duration) -> Self {
        self.admission_timeout = timeout;
        self
    }

    /// Set the maximum REST request body size.
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }
}
