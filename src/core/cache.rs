//! Key-value cache abstraction shared by the FX day cache and the TWR
//! calendar cache. Implementations live in `store/`.

use async_trait::async_trait;
use std::hash::Hash;
use std::time::Duration;

/// A get/set/TTL key-value cache. Entries are last-writer-wins; a TTL
/// of `None` means the entry never expires.
#[async_trait]
pub trait Cache<K, V>: Send + Sync
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn get(&self, key: &K) -> Option<V>;
    async fn put(&self, key: K, value: V, ttl: Option<Duration>);
    async fn remove(&self, key: &K);
    async fn clear(&self);
}
