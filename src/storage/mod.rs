//! Durable key/value storage for the points ledger.
//!
//! Values are plain strings with no schema versioning. The
//! [`KeyValueStore`] trait is the injection seam: production code uses
//! [`SqliteKeyValueStore`], tests and throwaway sessions use [`MemoryStore`].

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteKeyValueStore;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::StorageResult;

/// Key holding the lifetime point total.
pub const TOTAL_POINTS_KEY: &str = "totalPoints";
/// Key holding the date (`YYYY-MM-DD`) of the last scored exchange.
pub const LAST_ACTIVITY_DATE_KEY: &str = "lastActivityDate";
/// Key holding the lifetime count of scored questions.
pub const TOTAL_QUESTIONS_KEY: &str = "totalQuestionsCount";

/// Get/set-by-key storage.
///
/// Reads and writes are independent; there is no transaction spanning a
/// read and a later write.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get the value stored under `key`.
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;
    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    /// Remove `key` if present.
    async fn remove(&self, key: &str) -> StorageResult<()>;
    /// Remove every key.
    async fn clear(&self) -> StorageResult<()>;
}

#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key).await
    }

    async fn clear(&self) -> StorageResult<()> {
        (**self).clear().await
    }
}
