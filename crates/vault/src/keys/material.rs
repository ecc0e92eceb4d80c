//! Fixed-size key buffers: [`MasterKey`] and [`DataKey`].
//!
//! Both hold exactly [`KEY_LEN`] bytes, are zeroised on drop and never print
//! their contents in `Debug`. Neither implements `Serialize`: raw key material
//! only ever leaves this process wrapped.

use aes_gcm_siv::aead::{rand_core::RngCore, OsRng};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use journal_common::VaultError;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::cipher::CipherError;
use crate::crypto::KEY_LEN;

const FINGERPRINT_LABEL: &[u8] = b"journal-vault/master-key-fingerprint/v1";
const FINGERPRINT_LEN: usize = 8;

/// The process-wide key-encryption key. Supplied by configuration.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; KEY_LEN]);

impl MasterKey {
    /// Build from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Configuration`] unless `bytes` is exactly
    /// [`KEY_LEN`] bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, VaultError> {
        if bytes.len() != KEY_LEN {
            return Err(VaultError::Configuration(format!(
                "master key must decode to {KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let mut key = Self([0u8; KEY_LEN]);
        key.0.copy_from_slice(bytes);
        Ok(key)
    }

    /// Decode a standard-base64 master key.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Configuration`] if the value is empty, not valid
    /// base64, or does not decode to exactly [`KEY_LEN`] bytes.
    pub fn from_base64(encoded: &str) -> Result<Self, VaultError> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Err(VaultError::Configuration("master key is empty".into()));
        }
        let mut decoded = STANDARD
            .decode(encoded)
            .map_err(|_| VaultError::Configuration("master key is not valid base64".into()))?;
        let key = Self::from_slice(&decoded);
        decoded.zeroize();
        key
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Short, log-safe identifier of this key.
    ///
    /// First 8 bytes of `SHA-256(label ‖ key)` as lowercase hex.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::new()
            .chain_update(FINGERPRINT_LABEL)
            .chain_update(self.0)
            .finalize();
        digest[..FINGERPRINT_LEN]
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

/// A per-user content key. Persisted only in wrapped form.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct DataKey([u8; KEY_LEN]);

impl DataKey {
    /// Draw [`KEY_LEN`] bytes from the OS CSPRNG.
    ///
    /// # Panics
    ///
    /// Panics if the OS random source fails; there is no safe fallback.
    pub fn generate() -> Self {
        let mut key = Self([0u8; KEY_LEN]);
        OsRng.fill_bytes(&mut key.0);
        key
    }

    /// # Errors
    ///
    /// Returns [`CipherError::InvalidKeyLength`] unless `bytes` is exactly
    /// [`KEY_LEN`] bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CipherError> {
        if bytes.len() != KEY_LEN {
            return Err(CipherError::InvalidKeyLength(bytes.len()));
        }
        let mut key = Self([0u8; KEY_LEN]);
        key.0.copy_from_slice(bytes);
        Ok(key)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for DataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material, not even in debug builds.
        f.write_str("DataKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_key_from_base64() {
        let encoded = STANDARD.encode([0x01u8; KEY_LEN]);
        let key = MasterKey::from_base64(&encoded).unwrap();
        assert_eq!(key.as_bytes(), &[0x01u8; KEY_LEN]);
    }

    #[test]
    fn master_key_tolerates_surrounding_whitespace() {
        let encoded = format!("  {}\n", STANDARD.encode([0x02u8; KEY_LEN]));
        assert!(MasterKey::from_base64(&encoded).is_ok());
    }

    #[test]
    fn master_key_rejects_bad_values() {
        for bad in [
            String::new(),
            "   ".to_string(),
            "not base64 at all!".to_string(),
            STANDARD.encode([0u8; 16]),
            STANDARD.encode([0u8; 33]),
        ] {
            let err = MasterKey::from_base64(&bad).unwrap_err();
            assert!(matches!(err, VaultError::Configuration(_)), "accepted {bad:?}");
        }
    }

    #[test]
    fn fingerprint_is_stable_and_key_specific() {
        let a = MasterKey::from_slice(&[0x01u8; KEY_LEN]).unwrap();
        let b = MasterKey::from_slice(&[0x02u8; KEY_LEN]).unwrap();
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), FINGERPRINT_LEN * 2);
    }

    #[test]
    fn generated_data_keys_differ() {
        assert_ne!(DataKey::generate(), DataKey::generate());
    }

    #[test]
    fn data_key_rejects_wrong_length() {
        assert!(DataKey::from_slice(&[0u8; 31]).is_err());
        assert!(DataKey::from_slice(&[0u8; KEY_LEN]).is_ok());
    }

    #[test]
    fn key_material_redacted_in_debug() {
        let master = MasterKey::from_slice(&[0xFFu8; KEY_LEN]).unwrap();
        let data = DataKey::from_slice(&[0xFFu8; KEY_LEN]).unwrap();
        assert!(format!("{master:?}").contains("REDACTED"));
        assert!(format!("{data:?}").contains("REDACTED"));
        assert!(!format!("{data:?}").contains("255"));
    }
}
