//! Opaque session tokens.

use std::fmt;

use uuid::Uuid;

/// A random, opaque identifier naming a live session.
///
/// Tokens come from the OS random source (UUID v4) and are rendered as 32
/// lowercase hex characters. They are never derived from user input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generate a fresh token.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Borrow the token as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the token, returning its string form.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
