//! AES-256-GCM-SIV encryption and decryption with a detached tag.
//!
//! **Algorithm choice:** AES-256-GCM-SIV (RFC 8452): 256-bit key, 96-bit nonce,
//! 128-bit tag. Each call draws a fresh random nonce, so encrypting the same
//! plaintext twice under the same key yields different envelopes.
//!
//! Decryption is fail-closed: any mismatch in ciphertext, nonce, tag or key is
//! reported as an error and no plaintext is returned.

use aes_gcm_siv::{
    aead::{rand_core::RngCore, AeadInPlace, KeyInit, OsRng},
    Aes256GcmSiv, Nonce, Tag,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use journal_common::{EncryptedEnvelope, VaultError};
use thiserror::Error;
use zeroize::Zeroize;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of an AES-GCM-SIV nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the authentication tag (16 bytes = 128 bits).
pub const TAG_LEN: usize = 16;

/// Errors produced by the cipher layer.
///
/// Mapped into [`VaultError`] by [`encrypt`] / [`decrypt`] and by the key
/// wrapping functions in [`crate::keys`].
#[derive(Debug, Error)]
pub enum CipherError {
    /// The key is the wrong length (must be [`KEY_LEN`] bytes).
    #[error("invalid key length: expected {KEY_LEN} bytes, got {0}")]
    InvalidKeyLength(usize),

    /// AES-GCM-SIV encryption failed.
    #[error("aead seal failed")]
    SealFailure,

    /// Tag verification failed: wrong key or tampered data.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// A field is not valid base64.
    #[error("{0} is not valid base64")]
    InvalidEncoding(&'static str),

    /// A fixed-size field decoded to the wrong number of bytes.
    #[error("{field} has invalid length: expected {expected} bytes, got {got}")]
    InvalidFieldLength {
        field: &'static str,
        expected: usize,
        got: usize,
    },

    /// Authenticated plaintext is not UTF-8 text.
    #[error("decrypted plaintext is not valid UTF-8")]
    InvalidUtf8,
}

/// Raw output of one seal operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub nonce: [u8; NONCE_LEN],
    pub tag: [u8; TAG_LEN],
    pub ciphertext: Vec<u8>,
}

impl Sealed {
    /// Byte length of the `nonce ‖ tag` header.
    pub const HEADER_LEN: usize = NONCE_LEN + TAG_LEN;

    /// Concatenate as `nonce ‖ tag ‖ ciphertext`.
    pub fn to_concatenated(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::HEADER_LEN + self.ciphertext.len());
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.tag);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Split `nonce ‖ tag ‖ ciphertext` at its fixed offsets.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidFieldLength`] if `bytes` is shorter than
    /// [`Sealed::HEADER_LEN`].
    pub fn from_concatenated(bytes: &[u8]) -> Result<Self, CipherError> {
        if bytes.len() < Self::HEADER_LEN {
            return Err(CipherError::InvalidFieldLength {
                field: "sealed header",
                expected: Self::HEADER_LEN,
                got: bytes.len(),
            });
        }
        let (nonce, rest) = bytes.split_at(NONCE_LEN);
        let (tag, ciphertext) = rest.split_at(TAG_LEN);
        Ok(Self {
            nonce: to_array(nonce, "nonce")?,
            tag: to_array(tag, "auth_tag")?,
            ciphertext: ciphertext.to_vec(),
        })
    }

    /// Encode each part independently as standard base64.
    pub fn to_envelope(&self) -> EncryptedEnvelope {
        EncryptedEnvelope {
            ciphertext: STANDARD.encode(&self.ciphertext),
            nonce: STANDARD.encode(self.nonce),
            auth_tag: STANDARD.encode(self.tag),
        }
    }

    /// Decode the three envelope fields, checking the fixed-size ones.
    pub fn from_envelope(envelope: &EncryptedEnvelope) -> Result<Self, CipherError> {
        let nonce = decode_field(&envelope.nonce, "nonce")?;
        let tag = decode_field(&envelope.auth_tag, "auth_tag")?;
        let ciphertext = decode_field(&envelope.ciphertext, "ciphertext")?;
        Ok(Self {
            nonce: to_array(&nonce, "nonce")?,
            tag: to_array(&tag, "auth_tag")?,
            ciphertext,
        })
    }
}

/// Seal `plaintext` under `key` with a fresh random nonce.
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] if `key` is not [`KEY_LEN`] bytes.
/// Returns [`CipherError::SealFailure`] on an internal AEAD error (should be
/// unreachable with a valid key and nonce).
pub fn seal(plaintext: &[u8], key: &[u8]) -> Result<Sealed, CipherError> {
    let cipher = build_cipher(key)?;

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(&nonce), b"", &mut buffer)
        .map_err(|_| CipherError::SealFailure)?;

    Ok(Sealed {
        nonce,
        tag: to_array(tag.as_slice(), "auth_tag")?,
        ciphertext: buffer,
    })
}

/// Verify and open a [`Sealed`] value.
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] if `key` is not [`KEY_LEN`] bytes.
/// Returns [`CipherError::AuthenticationFailed`] if the tag does not verify.
pub fn open(sealed: &Sealed, key: &[u8]) -> Result<Vec<u8>, CipherError> {
    let cipher = build_cipher(key)?;
    let mut buffer = sealed.ciphertext.clone();
    let result = cipher.decrypt_in_place_detached(
        Nonce::from_slice(&sealed.nonce),
        b"",
        &mut buffer,
        Tag::from_slice(&sealed.tag),
    );
    if result.is_err() {
        buffer.zeroize();
        return Err(CipherError::AuthenticationFailed);
    }
    Ok(buffer)
}

/// Encrypt UTF-8 text under a 32-byte key.
///
/// # Errors
///
/// Returns [`VaultError::Encryption`] if `key` is not [`KEY_LEN`] bytes.
pub fn encrypt(plaintext: &str, key: &[u8]) -> Result<EncryptedEnvelope, VaultError> {
    seal(plaintext.as_bytes(), key)
        .map(|sealed| sealed.to_envelope())
        .map_err(|e| VaultError::Encryption(e.to_string()))
}

/// Decrypt an [`EncryptedEnvelope`] back to text.
///
/// # Errors
///
/// Returns [`VaultError::Decryption`] if any field fails to decode, the key is
/// the wrong length, the tag does not verify, or the plaintext is not UTF-8.
pub fn decrypt(envelope: &EncryptedEnvelope, key: &[u8]) -> Result<String, VaultError> {
    let open_text = || -> Result<String, CipherError> {
        let sealed = Sealed::from_envelope(envelope)?;
        let bytes = open(&sealed, key)?;
        String::from_utf8(bytes).map_err(|_| CipherError::InvalidUtf8)
    };
    open_text().map_err(|e| VaultError::Decryption(e.to_string()))
}

fn build_cipher(key: &[u8]) -> Result<Aes256GcmSiv, CipherError> {
    if key.len() != KEY_LEN {
        return Err(CipherError::InvalidKeyLength(key.len()));
    }
    Aes256GcmSiv::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength(key.len()))
}

fn decode_field(encoded: &str, field: &'static str) -> Result<Vec<u8>, CipherError> {
    STANDARD
        .decode(encoded)
        .map_err(|_| CipherError::InvalidEncoding(field))
}

fn to_array<const N: usize>(bytes: &[u8], field: &'static str) -> Result<[u8; N], CipherError> {
    bytes
        .try_into()
        .map_err(|_| CipherError::InvalidFieldLength {
            field,
            expected: N,
            got: bytes.len(),
        })
}
