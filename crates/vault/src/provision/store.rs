//! [`KeyStore`]: the narrow capability the provisioning service needs from
//! persistence, plus [`MemoryKeyStore`], an in-process implementation.
//!
//! Any backend (relational table, document store, distributed KV) can satisfy
//! the trait as long as it enforces uniqueness on the user id and reports a
//! duplicate insert as [`InsertOutcome::AlreadyExists`] rather than
//! overwriting the existing row.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use journal_common::{UserKeyRow, WrappedDataKey};
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors reported by a key store backend.
///
/// Retry and timeout policy belong to the backend client; the provisioning
/// service never retries on its own.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached or did not answer in time.
    #[error("key store unavailable: {0}")]
    Unavailable(String),

    /// The backend answered with an error other than a uniqueness conflict.
    #[error("key store operation failed: {0}")]
    Backend(String),
}

/// Result of a conditional insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The row was written; the caller's key is now authoritative.
    Inserted,
    /// A row for this user already existed and was left untouched.
    AlreadyExists,
}

/// Point lookup and conditional insert over per-user wrapped keys.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Fetch the wrapped key for `user_id`. `Ok(None)` means no row exists.
    async fn find(&self, user_id: &str) -> Result<Option<WrappedDataKey>, StoreError>;

    /// Insert a row for `user_id` unless one already exists.
    async fn insert_if_absent(
        &self,
        user_id: &str,
        wrapped: &WrappedDataKey,
    ) -> Result<InsertOutcome, StoreError>;
}

#[async_trait]
impl<S: KeyStore + ?Sized> KeyStore for Arc<S> {
    async fn find(&self, user_id: &str) -> Result<Option<WrappedDataKey>, StoreError> {
        (**self).find(user_id).await
    }

    async fn insert_if_absent(
        &self,
        user_id: &str,
        wrapped: &WrappedDataKey,
    ) -> Result<InsertOutcome, StoreError> {
        (**self).insert_if_absent(user_id, wrapped).await
    }
}

/// Thread-safe in-memory key table, unique on user id.
///
/// Clones share the same table.
#[derive(Clone, Debug, Default)]
pub struct MemoryKeyStore {
    inner: Arc<RwLock<HashMap<String, WrappedDataKey>>>,
}

impl MemoryKeyStore {
    /// Create a new, empty [`MemoryKeyStore`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Returns `true` if no rows are stored.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Snapshot of every row, e.g. to drive a re-wrap migration.
    pub async fn rows(&self) -> Vec<UserKeyRow> {
        self.inner
            .read()
            .await
            .iter()
            .map(|(user_id, wrapped)| UserKeyRow {
                user_id: user_id.clone(),
                wrapped_data_key: wrapped.clone(),
            })
            .collect()
    }

    /// Overwrite a row unconditionally. Only a rotation procedure that holds
    /// exclusive control of the table should call this.
    pub async fn replace(&self, row: UserKeyRow) {
        self.inner
            .write()
            .await
            .insert(row.user_id, row.wrapped_data_key);
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn find(&self, user_id: &str) -> Result<Option<WrappedDataKey>, StoreError> {
        Ok(self.inner.read().await.get(user_id).cloned())
    }

    async fn insert_if_absent(
        &self,
        user_id: &str,
        wrapped: &WrappedDataKey,
    ) -> Result<InsertOutcome, StoreError> {
        let mut table = self.inner.write().await;
        if table.contains_key(user_id) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        table.insert(user_id.to_owned(), wrapped.clone());
        Ok(InsertOutcome::Inserted)
    }
}
