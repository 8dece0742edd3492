//! Configuration for the session cache.

use std::time::Duration;

/// Default maximum number of live sessions.
pub const DEFAULT_CAPACITY: usize = 50;

/// Default absolute lifetime of a session (30 days).
pub const DEFAULT_ABSOLUTE_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Default inactivity window before a session expires (1 hour).
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(60 * 60);

/// Default interval between background sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for the session cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of sessions held at once.
    pub capacity: usize,

    /// Maximum lifetime of a session from creation, regardless of activity.
    pub absolute_ttl: Duration,

    /// Maximum gap between accesses before a session is considered expired.
    pub idle_ttl: Duration,

    /// Whether a background sweeper should reclaim expired sessions.
    /// If false, expired sessions are only reclaimed on access or eviction.
    pub enable_sweep_task: bool,

    /// Interval for the sweeper (if enabled).
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            absolute_ttl: DEFAULT_ABSOLUTE_TTL,
            idle_ttl: DEFAULT_IDLE_TTL,
            enable_sweep_task: true,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl CacheConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of sessions.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the absolute TTL.
    pub fn with_absolute_ttl(mut self, ttl: Duration) -> Self {
        self.absolute_ttl = ttl;
        self
    }

    /// Set the idle TTL.
    pub fn with_idle_ttl(mut self, ttl: Duration) -> Self {
        self.idle_ttl = ttl;
        self
    }

    /// Enable or disable the background sweeper.
    pub fn with_sweep_task(mut self, enabled: bool) -> Self {
        self.enable_sweep_task = enabled;
        self
    }

    /// Set the sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}
