//! Credential store error types.

use std::path::PathBuf;

/// Result type alias for credential operations.
pub type Result<T> = std::result::Result<T, CredentialError>;

/// Errors that can occur while registering or verifying credentials.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// No credential record exists for the username.
    #[error("no credential for user '{0}'")]
    NotFound(String),

    /// A credential record already exists for the username.
    #[error("username '{0}' is taken")]
    AlreadyExists(String),

    /// The password did not match the stored credential.
    #[error("authentication failed for user '{0}'")]
    AuthenticationFailed(String),

    /// The username cannot be used as a record name.
    #[error("invalid username '{username}': {reason}")]
    InvalidUsername { username: String, reason: &'static str },

    /// Reading or writing the credential directory failed.
    #[error("credential storage error at '{path}': {source}")]
    Storage {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The key derivation function rejected its inputs or parameters.
    #[error("key derivation failed: {0}")]
    Kdf(String),

    /// The blocking hashing task did not complete.
    #[error("credential task failed: {0}")]
    Task(String),
}

impl CredentialError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }
}
