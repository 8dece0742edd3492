//! Username rules.
//!
//! A username doubles as its credential file name, so only a conservative
//! portable character set is accepted.

use crate::error::{CredentialError, Result};

/// Longest accepted username, in bytes.
pub const MAX_USERNAME_LEN: usize = 64;

/// Check that a username can be stored.
pub fn validate_username(username: &str) -> Result<()> {
    let invalid = |reason: &'static str| -> Result<()> {
        Err(CredentialError::InvalidUsername {
            username: username.to_string(),
            reason,
        })
    };

    if username.is_empty() {
        return invalid("must not be empty");
    }
    if username.len() > MAX_USERNAME_LEN {
        return invalid("must be at most 64 characters");
    }
    if username.starts_with('.') {
        return invalid("must not start with '.'");
    }
    if !username
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'))
    {
        return invalid("may only contain letters, digits, '_', '-' and '.'");
    }

    Ok(())
}
