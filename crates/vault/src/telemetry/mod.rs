//! Tracing subscriber setup for processes embedding this library.
//!
//! The library itself only emits `tracing` events; installing a subscriber is
//! left to the composition root, which may call [`init`].
//!
//! # Telemetry invariants
//!
//! - **No key material, plaintext or ciphertext** may appear in any span
//!   field or log event. User ids and master-key fingerprints may.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`); `RUST_LOG`
//!   takes precedence when set.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Initialise a JSON tracing subscriber at the configured log level.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been set.
pub fn init(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise tracing subscriber: {e}"))
}
