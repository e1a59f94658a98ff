//! Key-value store trait.
//!
//! Defines the interface for namespaced client-side key-value storage.
//! Implementations live in parley-infra (durable) and `storage::memory`.

use parley_types::error::StorageError;

/// Trait for durable client-side key-value storage.
///
/// Values are arbitrary JSON. Uses RPITIT (native async fn in traits,
/// Rust 2024 edition).
pub trait KvStore: Send + Sync {
    /// Get a value by key. Returns None if the key does not exist.
    fn get(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<serde_json::Value>, StorageError>> + Send;

    /// Set a value for a key (upsert).
    fn set(
        &self,
        key: &str,
        value: &serde_json::Value,
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Delete a key. No-op if key does not exist.
    fn delete(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// List all keys starting with `prefix`, sorted.
    fn list_keys(
        &self,
        prefix: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>, StorageError>> + Send;
}
