//! At-rest record shapes.
//!
//! Only these types cross a persistence or serialisation boundary. All binary
//! fields are carried as standard base64 text; raw key material never appears
//! here.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Content envelopes
// ---------------------------------------------------------------------------

/// One encrypted plaintext value: three independently base64-encoded fields.
///
/// A fresh nonce is drawn on every encryption, so two envelopes of the same
/// plaintext under the same key never compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    /// Ciphertext without the authentication tag.
    pub ciphertext: String,
    /// 12-byte nonce.
    pub nonce: String,
    /// 16-byte authentication tag.
    pub auth_tag: String,
}

/// The envelope as stored alongside its owning content row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedTextColumns {
    pub text_ciphertext: String,
    pub text_nonce: String,
    pub text_auth_tag: String,
}

impl From<EncryptedEnvelope> for EncryptedTextColumns {
    fn from(env: EncryptedEnvelope) -> Self {
        Self {
            text_ciphertext: env.ciphertext,
            text_nonce: env.nonce,
            text_auth_tag: env.auth_tag,
        }
    }
}

impl From<EncryptedTextColumns> for EncryptedEnvelope {
    fn from(cols: EncryptedTextColumns) -> Self {
        Self {
            ciphertext: cols.text_ciphertext,
            nonce: cols.text_nonce,
            auth_tag: cols.text_auth_tag,
        }
    }
}

// ---------------------------------------------------------------------------
// Wrapped data keys
// ---------------------------------------------------------------------------

/// Base64 text of `nonce(12) ‖ authTag(16) ‖ ciphertext(32)`: a per-user
/// data key sealed under the master key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WrappedDataKey(String);

impl WrappedDataKey {
    /// Wrap stored text without inspecting it. Validation happens on unwrap.
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Per-user key row. `user_id` is unique in the backing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserKeyRow {
    pub user_id: String,
    pub wrapped_data_key: WrappedDataKey,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_envelope() -> EncryptedEnvelope {
        EncryptedEnvelope {
            ciphertext: "Y2lwaGVy".into(),
            nonce: "AAAAAAAAAAAAAAAA".into(),
            auth_tag: "AAAAAAAAAAAAAAAAAAAAAA==".into(),
        }
    }

    #[test]
    fn envelope_serialises_with_snake_case_fields() {
        let v = serde_json::to_value(sample_envelope()).unwrap();
        assert_eq!(v["ciphertext"], "Y2lwaGVy");
        assert!(v.get("auth_tag").is_some());
    }

    #[test]
    fn columns_conversion_is_lossless() {
        let env = sample_envelope();
        let cols = EncryptedTextColumns::from(env.clone());
        assert_eq!(cols.text_nonce, env.nonce);
        assert_eq!(EncryptedEnvelope::from(cols), env);
    }

    #[test]
    fn wrapped_key_is_transparent_in_json() {
        let row = UserKeyRow {
            user_id: "user-1".into(),
            wrapped_data_key: WrappedDataKey::new("d3JhcHBlZA=="),
        };
        let v = serde_json::to_value(&row).unwrap();
        assert_eq!(v, json!({"user_id": "user-1", "wrapped_data_key": "d3JhcHBlZA=="}));

        let decoded: UserKeyRow = serde_json::from_value(v).unwrap();
        assert_eq!(decoded.wrapped_data_key.as_str(), "d3JhcHBlZA==");
    }
}
