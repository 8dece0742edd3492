//! Session cache with expiration-aware LRU eviction.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::ttl::{ExpiryPolicy, SessionEntry};

type Entries<V> = LruCache<String, SessionEntry<V>>;

/// Session cache keyed by opaque token.
///
/// This cache provides:
/// - A hard bound of `capacity` entries
/// - Absolute and idle (sliding) expiration, checked on every access
/// - Expiration-aware LRU eviction: an expired entry is always evicted
///   before a live one
/// - Thread-safe access through a single mutex over the whole structure
///
/// The lock is never held across an `.await`, so the cache can be shared
/// freely between request tasks. Cloning is cheap and shares state.
pub struct SessionCache<V> {
    inner: Arc<Mutex<Entries<V>>>,
    policy: ExpiryPolicy,
    config: CacheConfig,
}

impl<V> SessionCache<V> {
    /// Create a new, empty cache.
    ///
    /// A zero capacity is raised to one.
    pub fn new(mut config: CacheConfig) -> Self {
        let cap = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        config.capacity = cap.get();

        Self {
            inner: Arc::new(Mutex::new(LruCache::new(cap))),
            policy: ExpiryPolicy::new(config.absolute_ttl, config.idle_ttl),
            config,
        }
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get the expiration policy.
    pub fn policy(&self) -> ExpiryPolicy {
        self.policy
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Current number of entries, including expired ones not yet reclaimed.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Insert a session.
    ///
    /// Replaces any entry already stored under `token`. When the cache is
    /// full, exactly one entry is evicted first: the least recently touched
    /// expired entry if there is one, otherwise the least recently touched
    /// entry overall.
    pub fn put(&self, token: impl Into<String>, value: V) -> Result<()> {
        let token = token.into();
        let now = Instant::now();
        let mut entries = self.inner.lock();

        if !entries.contains(token.as_str()) && entries.len() >= self.config.capacity {
            self.evict_one(&mut entries, now);

            if entries.len() >= self.config.capacity {
                return Err(Error::CapacityExhausted {
                    capacity: self.config.capacity,
                });
            }
        }

        entries.put(token, SessionEntry::new(value, now));

        trace!(cache_size = entries.len(), "Session inserted into cache");

        Ok(())
    }

    /// Run `f` against a live session's value, touching it.
    ///
    /// Follows the same expiration rules as [`get`](Self::get).
    pub fn with_mut<F, R>(&self, token: &str, f: F) -> Result<R>
    where
        F: FnOnce(&mut V) -> R,
    {
        let now = Instant::now();
        let mut entries = self.inner.lock();
        let entry = self.live_entry(&mut entries, token, now)?;
        Ok(f(&mut entry.value))
    }

    /// Remove a session, returning its value if it was live.
    pub fn remove(&self, token: &str) -> Option<V> {
        let now = Instant::now();
        let entry = self.inner.lock().pop(token)?;
        if entry.is_expired(&self.policy, now) {
            None
        } else {
            Some(entry.value)
        }
    }

    /// Check if a live session exists, without touching it.
    pub fn contains(&self, token: &str) -> bool {
        let now = Instant::now();
        self.inner
            .lock()
            .peek(token)
            .is_some_and(|entry| !entry.is_expired(&self.policy, now))
    }

    /// Remove every expired entry, returning how many were reclaimed.
    pub fn reap_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.inner.lock();

        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(&self.policy, now))
            .map(|(token, _)| token.clone())
            .collect();

        for token in &expired {
            entries.pop(token.as_str());
        }

        if !expired.is_empty() {
            debug!(
                count = expired.len(),
                cache_size = entries.len(),
                "Reaped expired sessions"
            );
        }

        expired.len()
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            capacity: self.config.capacity,
        }
    }

    /// Look up a live entry and touch it, dropping it if it has expired.
    fn live_entry<'a>(
        &self,
        entries: &'a mut Entries<V>,
        token: &str,
        now: Instant,
    ) -> Result<&'a mut SessionEntry<V>> {
        let expired = match entries.peek(token) {
            Some(entry) => entry.is_expired(&self.policy, now),
            None => return Err(Error::NotFound(token.to_string())),
        };

        if expired {
            entries.pop(token);
            debug!(cache_size = entries.len(), "Session expired, removed on access");
            return Err(Error::NotFound(token.to_string()));
        }

        let entry = entries
            .get_mut(token)
            .ok_or_else(|| Error::NotFound(token.to_string()))?;
        entry.touch(now);
        Ok(entry)
    }

    /// Evict one entry, preferring expired ones in least-recently-touched order.
    fn evict_one(&self, entries: &mut Entries<V>, now: Instant) {
        let expired = entries
            .iter()
            .rev()
            .find(|(_, entry)| entry.is_expired(&self.policy, now))
            .map(|(token, _)| token.clone());

        match expired {
            Some(token) => {
                entries.pop(token.as_str());
                debug!("Evicted expired session to make room");
            }
            None => {
                if entries.pop_lru().is_some() {
                    debug!("Evicted least recently used session to make room");
                }
            }
        }
    }
}

impl<V: Clone> SessionCache<V> {
    /// Get a live session's value.
    ///
    /// Missing and expired sessions both yield [`Error::NotFound`]; expired
    /// entries are removed. A successful read slides the idle window.
    pub fn get(&self, token: &str) -> Result<V> {
        let now = Instant::now();
        let mut entries = self.inner.lock();
        let entry = self.live_entry(&mut entries, token, now)?;
        Ok(entry.value.clone())
    }
}

impl<V> Clone for SessionCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            policy: self.policy,
            config: self.config.clone(),
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Current number of cached sessions.
    pub size: usize,

    /// Maximum capacity.
    pub capacity: usize,
}
