use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

/// Shared key-value store used for the cycle lock and the per-tenant dedup
/// keys. `set_if_absent` must be atomic across replicas.
#[async_trait]
#[automock]
pub trait KeyValueStore {
    /// Returns true when the key was absent and is now set with the TTL.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool>;

    async fn delete(&self, key: &str) -> Result<()>;
}
