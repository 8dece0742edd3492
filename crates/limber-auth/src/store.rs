//! On-disk credential records.
//!
//! Each registered user owns exactly one file, `<root>/<username>`, holding
//! the raw 32-byte derived key and nothing else. Records are created with an
//! exclusive open, so two concurrent registrations for the same name cannot
//! both succeed, and are never rewritten.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{CredentialError, Result};
use crate::kdf::{KEY_LEN, KdfParams, derive_key, keys_match};
use crate::username::validate_username;

/// Username/password store backed by a directory of derived keys.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    root: PathBuf,
    params: KdfParams,
}

impl CredentialStore {
    /// Open the store at `root` with the default cost parameters, creating
    /// the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with_params(root, KdfParams::default())
    }

    /// Open the store with explicit cost parameters.
    pub fn open_with_params(root: impl Into<PathBuf>, params: KdfParams) -> Result<Self> {
        let root = root.into();
        create_private_dir(&root)?;
        debug!(path = %root.display(), "Credential store opened");
        Ok(Self { root, params })
    }

    /// Directory holding the records.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cost parameters used for derivation.
    pub fn params(&self) -> KdfParams {
        self.params
    }

    /// Whether the record directory is still in place.
    pub fn is_ready(&self) -> bool {
        self.root.is_dir()
    }

    /// Check whether a record exists for `username`.
    pub fn exists(&self, username: &str) -> Result<bool> {
        validate_username(username)?;
        let path = self.record_path(username);
        path.try_exists()
            .map_err(|e| CredentialError::storage(&path, e))
    }

    /// Register a new user, blocking the current thread while hashing.
    pub fn register_blocking(&self, username: &str, password: &str) -> Result<()> {
        if self.exists(username)? {
            return Err(CredentialError::AlreadyExists(username.to_string()));
        }

        let key = derive_key(&self.params, username, password)?;
        let path = self.record_path(username);

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = match options.open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(CredentialError::AlreadyExists(username.to_string()));
            }
            Err(e) => return Err(CredentialError::storage(&path, e)),
        };

        if let Err(e) = file.write_all(&key).and_then(|()| file.sync_all()) {
            // Leave no truncated record behind that would lock the name
            let _ = fs::remove_file(&path);
            return Err(CredentialError::storage(&path, e));
        }

        info!(username = %username, "Registered credential");
        Ok(())
    }

    /// Verify a password, blocking the current thread while hashing.
    pub fn verify_blocking(&self, username: &str, password: &str) -> Result<()> {
        validate_username(username)?;
        let path = self.record_path(username);

        let stored = match fs::read(&path) {
            Ok(stored) => stored,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CredentialError::NotFound(username.to_string()));
            }
            Err(e) => return Err(CredentialError::storage(&path, e)),
        };

        let derived = derive_key(&self.params, username, password)?;
        if keys_match(&stored, &derived) {
            return Ok(());
        }

        if stored.len() != KEY_LEN {
            warn!(
                username = %username,
                len = stored.len(),
                "Credential record has unexpected length"
            );
        }
        Err(CredentialError::AuthenticationFailed(username.to_string()))
    }

    /// Register a new user.
    ///
    /// Hashing runs on Tokio's blocking pool so request workers stay free.
    pub async fn register(&self, username: &str, password: &str) -> Result<()> {
        let store = self.clone();
        let username = username.to_string();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || store.register_blocking(&username, &password))
            .await
            .map_err(|e| CredentialError::Task(e.to_string()))?
    }

    /// Verify a password.
    ///
    /// Hashing runs on Tokio's blocking pool so request workers stay free.
    pub async fn verify(&self, username: &str, password: &str) -> Result<()> {
        let store = self.clone();
        let username = username.to_string();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || store.verify_blocking(&username, &password))
            .await
            .map_err(|e| CredentialError::Task(e.to_string()))?
    }

    fn record_path(&self, username: &str) -> PathBuf {
        self.root.join(username)
    }
}

/// Create `dir` (and parents) readable only by the owner. Existing
/// directories are left as they are.
fn create_private_dir(dir: &Path) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder
        .create(dir)
        .map_err(|e| CredentialError::storage(dir, e))
}
