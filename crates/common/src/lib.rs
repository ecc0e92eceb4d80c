//! Record shapes and the error taxonomy shared across `journal-vault` crates.

pub mod error;
pub mod protocol;

pub use error::VaultError;
pub use protocol::{EncryptedEnvelope, EncryptedTextColumns, UserKeyRow, WrappedDataKey};
