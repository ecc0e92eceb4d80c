//! Error taxonomy for the envelope encryption layer.

use thiserror::Error;

/// Generic message returned to untrusted callers for every variant.
pub const PUBLIC_MESSAGE: &str = "internal error";

/// Top-level error type for key management and content encryption.
///
/// None of the variants is recoverable by retrying the same request; all of
/// them map to a 500 with the generic [`PUBLIC_MESSAGE`]. The detail string is
/// for operators and must never be echoed to end users.
#[derive(Debug, Error)]
pub enum VaultError {
    /// The master key (active or rotation target) is missing or malformed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Tag verification failed, or an envelope / wrapped key is malformed.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Sealing plaintext failed, e.g. a caller-supplied key of the wrong length.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// The insert-or-read race resolved to no usable key.
    #[error("key provisioning failed: {0}")]
    KeyProvisioning(String),
}

impl VaultError {
    /// Short machine-readable code, suitable for log fields.
    pub fn code(&self) -> &'static str {
        match self {
            VaultError::Configuration(_) => "configuration_error",
            VaultError::Decryption(_) => "decryption_error",
            VaultError::Encryption(_) => "encryption_error",
            VaultError::KeyProvisioning(_) => "key_provisioning_error",
        }
    }

    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        500
    }

    /// Message safe to expose to callers. Identical for every variant.
    pub fn public_message(&self) -> &'static str {
        PUBLIC_MESSAGE
    }
}
