//! Key Provisioning: resolve the data key for a user, creating it on first use.
//!
//! # Lifecycle
//!
//! 1. Look up the user's wrapped key in the [`KeyStore`].
//! 2. If present, unwrap it under the master key and return it.
//! 3. If absent, generate and wrap a new key, then insert it conditionally.
//!    - [`InsertOutcome::Inserted`]: the new key is authoritative.
//!    - [`InsertOutcome::AlreadyExists`]: a concurrent request won; re-read
//!      its row and adopt that key, discarding ours.
//!    - Store error: re-read once; if nothing is there, fail.
//!
//! At most one generate, one insert and one extra read per call. There is no
//! retry loop and no per-process cache; every request resolves its key from
//! the store.
//!
//! # Security invariants
//!
//! - There is no fallback to a default, zero or unwrapped key. Every failure
//!   surfaces as a [`VaultError`].
//! - Exactly one data key per user becomes authoritative, provided the store
//!   enforces uniqueness on the user id.

pub mod store;

pub use store::{InsertOutcome, KeyStore, MemoryKeyStore, StoreError};

use journal_common::{EncryptedEnvelope, VaultError, WrappedDataKey};
use tracing::{debug, error, info, instrument, warn};

use crate::crypto::cipher;
use crate::keys::{DataKey, KeyManager};

/// Maps user ids to their data keys through a [`KeyStore`].
#[derive(Clone, Debug)]
pub struct KeyProvisioner<S> {
    keys: KeyManager,
    store: S,
}

impl<S: KeyStore> KeyProvisioner<S> {
    pub fn new(keys: KeyManager, store: S) -> Self {
        Self { keys, store }
    }

    pub fn key_manager(&self) -> &KeyManager {
        &self.keys
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Return the data key for `user_id`, creating and persisting one if the
    /// user has none yet.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Decryption`] if the stored key does not unwrap under
    ///   the active master key (master key mismatch or corrupted row).
    /// - [`VaultError::KeyProvisioning`] if the store cannot be read, or the
    ///   insert-or-read sequence finds no key.
    #[instrument(skip(self))]
    pub async fn get_or_create_user_data_key(&self, user_id: &str) -> Result<DataKey, VaultError> {
        let existing = self.store.find(user_id).await.map_err(|e| {
            error!(error = %e, "data key lookup failed");
            VaultError::KeyProvisioning(format!("lookup failed: {e}"))
        })?;
        if let Some(wrapped) = existing {
            return self.unwrap_stored(&wrapped);
        }

        let fresh = KeyManager::generate_data_key();
        let wrapped = self.keys.wrap_data_key(&fresh)?;

        match self.store.insert_if_absent(user_id, &wrapped).await {
            Ok(InsertOutcome::Inserted) => {
                info!(master = %self.keys.fingerprint(), "provisioned new data key");
                Ok(fresh)
            }
            Ok(InsertOutcome::AlreadyExists) => {
                debug!("lost first-use race; adopting existing data key");
                self.adopt_existing(user_id).await
            }
            Err(e) => {
                warn!(error = %e, "data key insert failed; re-reading");
                self.adopt_existing(user_id).await
            }
        }
    }

    /// Encrypt `plaintext` under the user's data key.
    pub async fn encrypt_for_user(
        &self,
        user_id: &str,
        plaintext: &str,
    ) -> Result<EncryptedEnvelope, VaultError> {
        let key = self.get_or_create_user_data_key(user_id).await?;
        cipher::encrypt(plaintext, key.as_bytes())
    }

    /// Decrypt an envelope previously produced for this user.
    pub async fn decrypt_for_user(
        &self,
        user_id: &str,
        envelope: &EncryptedEnvelope,
    ) -> Result<String, VaultError> {
        let key = self.get_or_create_user_data_key(user_id).await?;
        cipher::decrypt(envelope, key.as_bytes()).map_err(|e| {
            warn!(user_id, error = %e, "content decryption failed");
            e
        })
    }

    async fn adopt_existing(&self, user_id: &str) -> Result<DataKey, VaultError> {
        match self.store.find(user_id).await {
            Ok(Some(wrapped)) => self.unwrap_stored(&wrapped),
            Ok(None) => {
                error!("no data key present after insert attempt");
                Err(VaultError::KeyProvisioning(
                    "no data key present after insert attempt".into(),
                ))
            }
            Err(e) => {
                error!(error = %e, "re-read after insert attempt failed");
                Err(VaultError::KeyProvisioning(format!(
                    "re-read after insert attempt failed: {e}"
                )))
            }
        }
    }

    fn unwrap_stored(&self, wrapped: &WrappedDataKey) -> Result<DataKey, VaultError> {
        self.keys.unwrap_data_key(wrapped).map_err(|e| {
            error!(
                master = %self.keys.fingerprint(),
                error = %e,
                "stored data key does not unwrap under the active master key"
            );
            e
        })
    }
}
