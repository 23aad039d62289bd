use crate::errors::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// A shared, type-erased hash store.
pub type HashStoreHandle = Arc<dyn HashStore>;

/// Object-safe key/value store whose values are hash maps with a per-key TTL.
///
/// Implementations must be internally synchronized; all methods take `&self`.
/// An expired key behaves exactly like a missing one.
#[async_trait]
pub trait HashStore: Send + Sync {
    /// Sets `field` of the hash at `key` to `value`, creating the hash if needed.
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()>;

    /// Returns all values of the hash at `key`. A missing key yields an empty list.
    async fn hvals(&self, key: &str) -> Result<Vec<String>>;

    /// Sets the time to live of `key`. Returns `false` if the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Remaining time to live of `key`, or `None` if the key is missing or has no TTL.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>>;

    /// Removes `key` and all of its fields.
    async fn del(&self, key: &str) -> Result<()>;
}
