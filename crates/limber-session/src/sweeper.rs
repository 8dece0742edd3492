//! Background reclamation of expired sessions.
//!
//! Correctness never depends on the sweeper: every read re-checks both
//! TTLs. The sweeper only bounds how long expired entries linger between
//! accesses.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cache::SessionCache;

impl<V: Send + 'static> SessionCache<V> {
    /// Spawn a task that calls [`reap_expired`](Self::reap_expired) every
    /// `sweep_interval` until `cancel` fires.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn_sweeper(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let cache = self.clone();
        // interval_at panics on a zero period
        let period = self.config().sweep_interval.max(Duration::from_millis(1));

        let Some(first_tick) = Instant::now().checked_add(period) else {
            // The first sweep would land past the end of the clock
            debug!(?period, "Session sweep interval out of range, sweeper idle");
            return tokio::spawn(async move { cancel.cancelled().await });
        };
        let mut ticker = interval_at(first_tick, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Session sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        cache.reap_expired();
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::advance;
    use tokio_util::sync::CancellationToken;

    use crate::{CacheConfig, SessionCache};

    fn cache() -> SessionCache<u32> {
        SessionCache::new(
            CacheConfig::new()
                .with_capacity(10)
                .with_absolute_ttl(Duration::from_secs(1000))
                .with_idle_ttl(Duration::from_secs(30))
                .with_sweep_interval(Duration::from_secs(60)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_reclaims_expired_sessions() {
        let cache = cache();
        let cancel = CancellationToken::new();
        let handle = cache.spawn_sweeper(cancel.clone());

        cache.put("s1", 1).unwrap();
        cache.put("s2", 2).unwrap();
        assert_eq!(cache.len(), 2);

        tokio::time::sleep(Duration::from_secs(61)).await;

        assert_eq!(cache.len(), 0);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_sweep_interval_does_not_panic() {
        let cache: SessionCache<u32> = SessionCache::new(
            CacheConfig::new()
                .with_idle_ttl(Duration::from_secs(30))
                .with_sweep_interval(Duration::from_secs(u64::MAX)),
        );
        let cancel = CancellationToken::new();
        let handle = cache.spawn_sweeper(cancel.clone());

        cache.put("s1", 1).unwrap();
        advance(Duration::from_secs(3600)).await;
        assert_eq!(cache.len(), 1);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_stops_on_cancel() {
        let cache = cache();
        let cancel = CancellationToken::new();
        let handle = cache.spawn_sweeper(cancel.clone());

        cancel.cancel();
        handle.await.unwrap();

        cache.put("s1", 1).unwrap();
        advance(Duration::from_secs(120)).await;

        // Nothing sweeps any more; the entry lingers until it is accessed
        assert_eq!(cache.len(), 1);
        assert!(cache.get("s1").is_err());
        assert_eq!(cache.len(), 0);
    }
}
