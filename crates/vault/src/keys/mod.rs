//! Key Manager: data-key generation and wrapping under the master key.
//!
//! # Wrapped key format
//!
//! ```text
//! base64( nonce(12) ‖ tag(16) ‖ ciphertext(32) )
//! ```
//!
//! # Security invariants
//!
//! - Raw [`DataKey`] bytes are never persisted, logged, or included in traces.
//! - The master key is resolved once at the composition root and injected
//!   here; nothing in this module reads configuration on its own.
//! - Rotation ([`KeyManager::rewrap_data_key`]) handles one row. Iterating
//!   every stored key and swapping the configured master key belongs to the
//!   migration procedure that calls it.

pub mod material;

pub use material::{DataKey, MasterKey};

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use journal_common::{VaultError, WrappedDataKey};
use tracing::debug;
use zeroize::Zeroize;

use crate::config::Config;
use crate::crypto::cipher::{self, Sealed};

/// Wraps and unwraps data keys under one master key.
///
/// Cheap to clone; the master key is shared behind an `Arc`.
#[derive(Clone, Debug)]
pub struct KeyManager {
    master: Arc<MasterKey>,
}

impl KeyManager {
    pub fn new(master: MasterKey) -> Self {
        Self {
            master: Arc::new(master),
        }
    }

    /// Resolve the master key from `cfg`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Configuration`] if the configured master key is
    /// missing or malformed.
    pub fn from_config(cfg: &Config) -> Result<Self, VaultError> {
        Ok(Self::new(cfg.master_key()?))
    }

    /// Log-safe fingerprint of the active master key.
    pub fn fingerprint(&self) -> String {
        self.master.fingerprint()
    }

    /// Generate a fresh random data key.
    pub fn generate_data_key() -> DataKey {
        DataKey::generate()
    }

    /// Wrap `key` under the active master key.
    pub fn wrap_data_key(&self, key: &DataKey) -> Result<WrappedDataKey, VaultError> {
        wrap_data_key(&self.master, key)
    }

    /// Unwrap a stored key under the active master key.
    pub fn unwrap_data_key(&self, wrapped: &WrappedDataKey) -> Result<DataKey, VaultError> {
        unwrap_data_key(&self.master, wrapped)
    }

    /// Re-wrap `wrapped` from the active master key onto `new_master_key`.
    ///
    /// The new key is validated before any decryption is attempted.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Configuration`] if `new_master_key` is not
    /// exactly 32 bytes, or [`VaultError::Decryption`] if `wrapped` does not
    /// open under the active master key.
    pub fn rewrap_data_key(
        &self,
        wrapped: &WrappedDataKey,
        new_master_key: &[u8],
    ) -> Result<WrappedDataKey, VaultError> {
        let next = MasterKey::from_slice(new_master_key)?;
        self.rewrap_under(wrapped, &next)
    }

    /// Same as [`KeyManager::rewrap_data_key`] with an already validated key.
    pub fn rewrap_under(
        &self,
        wrapped: &WrappedDataKey,
        next: &MasterKey,
    ) -> Result<WrappedDataKey, VaultError> {
        let key = self.unwrap_data_key(wrapped)?;
        let rewrapped = wrap_data_key(next, &key)?;
        debug!(
            from = %self.fingerprint(),
            to = %next.fingerprint(),
            "re-wrapped data key"
        );
        Ok(rewrapped)
    }
}

/// Wrap `key` under `master` with a fresh nonce.
///
/// # Errors
///
/// Returns [`VaultError::Encryption`] on an internal AEAD failure.
pub fn wrap_data_key(master: &MasterKey, key: &DataKey) -> Result<WrappedDataKey, VaultError> {
    let sealed = cipher::seal(key.as_bytes(), master.as_bytes())
        .map_err(|e| VaultError::Encryption(format!("wrapping data key: {e}")))?;
    Ok(WrappedDataKey::new(STANDARD.encode(sealed.to_concatenated())))
}

/// Unwrap `wrapped` under `master`.
///
/// # Errors
///
/// Returns [`VaultError::Decryption`] if the value is not base64, is shorter
/// than the 28-byte header, fails tag verification, or does not contain a
/// 32-byte key.
pub fn unwrap_data_key(
    master: &MasterKey,
    wrapped: &WrappedDataKey,
) -> Result<DataKey, VaultError> {
    let decryption =
        |e: cipher::CipherError| VaultError::Decryption(format!("unwrapping data key: {e}"));

    let decoded = STANDARD
        .decode(wrapped.as_str())
        .map_err(|_| VaultError::Decryption("wrapped data key is not valid base64".into()))?;
    let sealed = Sealed::from_concatenated(&decoded).map_err(decryption)?;
    let mut raw = cipher::open(&sealed, master.as_bytes()).map_err(decryption)?;
    let key = DataKey::from_slice(&raw).map_err(decryption);
    raw.zeroize();
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{KEY_LEN, NONCE_LEN, TAG_LEN};

    fn manager(byte: u8) -> KeyManager {
        KeyManager::new(MasterKey::from_slice(&[byte; KEY_LEN]).unwrap())
    }

    #[test]
    fn wrap_unwrap_round_trip() {
        let keys = manager(0x01);
        for _ in 0..8 {
            let dek = KeyManager::generate_data_key();
            let wrapped = keys.wrap_data_key(&dek).unwrap();
            assert_eq!(keys.unwrap_data_key(&wrapped).unwrap(), dek);
        }
    }

    #[test]
    fn wrapped_layout_is_60_bytes() {
        let keys = manager(0x01);
        let wrapped = keys.wrap_data_key(&DataKey::generate()).unwrap();
        let decoded = STANDARD.decode(wrapped.as_str()).unwrap();
        assert_eq!(decoded.len(), NONCE_LEN + TAG_LEN + KEY_LEN);
    }

    #[test]
    fn wrapping_is_non_deterministic() {
        let keys = manager(0x01);
        let dek = DataKey::generate();
        assert_ne!(
            keys.wrap_data_key(&dek).unwrap(),
            keys.wrap_data_key(&dek).unwrap()
        );
    }

    #[test]
    fn unwrap_under_other_master_fails() {
        let wrapped = manager(0x01).wrap_data_key(&DataKey::generate()).unwrap();
        let err = manager(0x02).unwrap_data_key(&wrapped).unwrap_err();
        assert!(matches!(err, VaultError::Decryption(_)));
    }

    #[test]
    fn unwrap_rejects_truncated_and_garbage_input() {
        let keys = manager(0x01);
        let short = WrappedDataKey::new(STANDARD.encode([0u8; 27]));
        assert!(matches!(keys.unwrap_data_key(&short), Err(VaultError::Decryption(_))));

        let garbage = WrappedDataKey::new("%%% not base64 %%%");
        assert!(matches!(keys.unwrap_data_key(&garbage), Err(VaultError::Decryption(_))));
    }

    #[test]
    fn unwrap_rejects_sealed_payload_of_wrong_length() {
        let master = MasterKey::from_slice(&[0x01u8; KEY_LEN]).unwrap();
        let sealed = cipher::seal(&[0u8; 16], master.as_bytes()).unwrap();
        let wrapped = WrappedDataKey::new(STANDARD.encode(sealed.to_concatenated()));
        let err = unwrap_data_key(&master, &wrapped).unwrap_err();
        assert!(matches!(err, VaultError::Decryption(_)));
    }

    #[test]
    fn tampered_wrapped_key_fails() {
        let keys = manager(0x01);
        let wrapped = keys.wrap_data_key(&DataKey::generate()).unwrap();
        let mut bytes = STANDARD.decode(wrapped.as_str()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = WrappedDataKey::new(STANDARD.encode(bytes));
        assert!(matches!(keys.unwrap_data_key(&tampered), Err(VaultError::Decryption(_))));
    }

    #[test]
    fn rewrap_moves_key_to_new_master() {
        let old = manager(0x01);
        let new = manager(0x02);
        let dek = DataKey::generate();
        let wrapped = old.wrap_data_key(&dek).unwrap();

        let rewrapped = old.rewrap_data_key(&wrapped, &[0x02u8; KEY_LEN]).unwrap();

        assert_eq!(
            new.unwrap_data_key(&rewrapped).unwrap(),
            old.unwrap_data_key(&wrapped).unwrap()
        );
        assert!(old.unwrap_data_key(&rewrapped).is_err());
    }

    #[test]
    fn rewrap_rejects_bad_new_master_before_unwrapping() {
        let keys = manager(0x01);
        // Garbage input would be a decryption error if it were ever opened.
        let garbage = WrappedDataKey::new("garbage");
        let err = keys.rewrap_data_key(&garbage, &[0u8; 16]).unwrap_err();
        assert!(matches!(err, VaultError::Configuration(_)));
    }

    #[test]
    fn from_config_rejects_missing_master_key() {
        let cfg = Config {
            encryption_master_key: None,
            log_level: "info".into(),
        };
        let err = KeyManager::from_config(&cfg).unwrap_err();
        assert!(matches!(err, VaultError::Configuration(_)));
    }
}
