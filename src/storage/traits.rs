use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as Json;

use super::error::StorageError;

/// A key-value store shared by enrichment transforms
///
/// Implementations must be safe for concurrent use: one handle is shared by
/// every worker of every stage that names the store.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a value; expired or absent keys read as `None`
    async fn get(&self, key: &str) -> Result<Option<Json>, StorageError>;

    /// Write a value without expiry
    async fn set(&self, key: &str, value: Json) -> Result<(), StorageError>;

    /// Write a value that expires after `ttl`
    async fn set_with_ttl(&self, key: &str, value: Json, ttl: Duration) -> Result<(), StorageError>;

    /// Release resources held by the store
    async fn close(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
