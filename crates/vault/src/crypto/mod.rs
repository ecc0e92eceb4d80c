//! AES-256-GCM-SIV primitives for journal text and key material.
//!
//! This module has no knowledge of users, stores or configuration. It seals
//! bytes under a caller-supplied 32-byte key.
//!
//! # Envelope format
//!
//! Content is stored as three independent standard-base64 fields:
//!
//! ```text
//! ciphertext = base64(ciphertext)     (same length as the UTF-8 plaintext)
//! nonce      = base64(nonce)          (12 bytes)
//! auth_tag   = base64(tag)            (16 bytes)
//! ```
//!
//! Wrapped keys use the same primitive with the fields concatenated as
//! `nonce ‖ tag ‖ ciphertext` (see [`cipher::Sealed::to_concatenated`]).

pub mod cipher;

pub use cipher::{decrypt, encrypt, KEY_LEN, NONCE_LEN, TAG_LEN};
