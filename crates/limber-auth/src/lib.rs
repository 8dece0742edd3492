//! Credential store for Limber.
//!
//! Registers and verifies username/password pairs without ever persisting
//! plaintext:
//! - Argon2id key derivation (1 pass, 46 MiB, 1 lane, 32-byte key)
//! - One record per user, created atomically and never rewritten
//! - Constant-time key comparison
//!
//! # Example
//!
//! ```rust,ignore
//! use limber_auth::CredentialStore;
//!
//! let store = CredentialStore::open(".limber/auth")?;
//! store.register("alice", "pw1").await?;
//! store.verify("alice", "pw1").await?;
//! ```

mod error;
mod kdf;
mod store;
mod username;

pub use error::{CredentialError, Result};
pub use kdf::{DerivedKey, KEY_LEN, KdfParams, derive_key, keys_match};
pub use store::CredentialStore;
pub use username::{MAX_USERNAME_LEN, validate_username};
