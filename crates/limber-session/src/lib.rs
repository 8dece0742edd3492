//! Session cache with capacity bound and two-clock expiration.
//!
//! This crate provides the in-memory session store for Limber:
//! - A hard capacity bound with expiration-aware LRU eviction
//! - Absolute TTL (from creation) and idle TTL (from last access)
//! - Lazy expiration on every access plus an optional background sweeper
//! - Random opaque [`SessionToken`]s
//!
//! # Example
//!
//! ```rust,ignore
//! use limber_session::{CacheConfig, SessionCache, SessionToken};
//!
//! let config = CacheConfig::default()
//!     .with_capacity(50)
//!     .with_idle_ttl(Duration::from_secs(3600));
//!
//! let cache = SessionCache::new(config);
//! let token = SessionToken::generate();
//! cache.put(token.as_str(), user)?;
//! ```

mod cache;
mod config;
mod error;
mod sweeper;
mod token;
mod ttl;

pub use cache::{CacheStats, SessionCache};
pub use config::{
    CacheConfig, DEFAULT_ABSOLUTE_TTL, DEFAULT_CAPACITY, DEFAULT_IDLE_TTL, DEFAULT_SWEEP_INTERVAL,
};
pub use error::{Error, Result};
pub use token::SessionToken;
pub use ttl::{ExpiryPolicy, SessionEntry};
