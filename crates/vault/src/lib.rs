//! Envelope encryption for journal text.
//!
//! Two-tier key scheme: every user's content is sealed under a per-user
//! [`DataKey`], and each data key is stored only in wrapped form, sealed under
//! a process-wide [`MasterKey`]. The operator's database never holds a key
//! that can read content on its own.
//!
//! - [`crypto`]: AES-256-GCM-SIV envelopes (ciphertext, nonce, tag).
//! - [`keys`]: data-key generation, wrap, unwrap and re-wrap.
//! - [`provision`]: get-or-create of a user's data key over a [`KeyStore`].
//!
//! The master key is resolved once from [`Config`] and injected into a
//! [`KeyManager`]:
//!
//! ```no_run
//! use journal_vault::{Config, KeyManager, KeyProvisioner, MemoryKeyStore};
//!
//! # async fn run() -> Result<(), journal_vault::VaultError> {
//! let cfg = Config::from_env()?;
//! let provisioner = KeyProvisioner::new(KeyManager::from_config(&cfg)?, MemoryKeyStore::new());
//! let envelope = provisioner.encrypt_for_user("user-1", "Hello, journal.").await?;
//! let text = provisioner.decrypt_for_user("user-1", &envelope).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod crypto;
pub mod keys;
pub mod provision;
pub mod telemetry;

pub use config::Config;
pub use journal_common::{
    EncryptedEnvelope, EncryptedTextColumns, UserKeyRow, VaultError, WrappedDataKey,
};
pub use keys::{DataKey, KeyManager, MasterKey};
pub use provision::{InsertOutcome, KeyProvisioner, KeyStore, MemoryKeyStore, StoreError};
