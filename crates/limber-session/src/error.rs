//! Error types for session cache operations.

/// Error type for session cache operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No live session exists for the token (never stored, evicted or expired).
    #[error("Session not found: {0}")]
    NotFound(String),

    /// Eviction could not free a slot for a new session.
    #[error("Session cache exhausted (capacity {capacity})")]
    CapacityExhausted { capacity: usize },
}

/// Result type for session cache operations.
pub type Result<T> = std::result::Result<T, Error>;
