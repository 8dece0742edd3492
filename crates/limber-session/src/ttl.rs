//! Two-clock expiration for session entries.

use std::time::Duration;

use tokio::time::Instant;

/// Absolute and idle lifetimes applied to every entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    /// Maximum age since creation.
    pub absolute_ttl: Duration,
    /// Maximum time since the last access.
    pub idle_ttl: Duration,
}

impl ExpiryPolicy {
    /// Create a policy from the two lifetimes.
    pub fn new(absolute_ttl: Duration, idle_ttl: Duration) -> Self {
        Self {
            absolute_ttl,
            idle_ttl,
        }
    }

    /// Check whether an entry with the given timestamps is expired at `now`.
    ///
    /// An entry is live while both windows hold; reaching a window's bound
    /// exactly still counts as live.
    pub fn is_expired(&self, created_at: Instant, last_touched_at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(created_at) > self.absolute_ttl
            || now.saturating_duration_since(last_touched_at) > self.idle_ttl
    }
}

/// A value stored in the cache along with its timestamps.
#[derive(Debug, Clone)]
pub struct SessionEntry<V> {
    /// Opaque session payload.
    pub value: V,

    created_at: Instant,
    last_touched_at: Instant,
}

impl<V> SessionEntry<V> {
    /// Create an entry created and touched at `now`.
    pub fn new(value: V, now: Instant) -> Self {
        Self {
            value,
            created_at: now,
            last_touched_at: now,
        }
    }

    /// When the entry was created.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// When the entry was last read or written.
    pub fn last_touched_at(&self) -> Instant {
        self.last_touched_at
    }

    /// Record an access. Never moves the timestamp backwards.
    pub fn touch(&mut self, now: Instant) {
        if now > self.last_touched_at {
            self.last_touched_at = now;
        }
    }

    /// Check this entry against a policy.
    pub fn is_expired(&self, policy: &ExpiryPolicy, now: Instant) -> bool {
        policy.is_expired(self.created_at, self.last_touched_at, now)
    }
}
