use crate::core::cache::Cache;
use anyhow::Result;
use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::marker::PhantomData;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::debug;

#[derive(Serialize, Deserialize)]
struct CacheEntry<V> {
    value: V,
    expires_at: Option<SystemTime>,
}

/// Cross-request key-value store backed by a fjall keyspace. Each
/// named collection is one partition; entries carry their own expiry
/// so staleness survives process restarts.
pub struct KvStore {
    keyspace: Keyspace,
}

impl KvStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)?;
        let keyspace = fjall::Config::new(path).open()?;
        Ok(Self { keyspace })
    }

    pub fn collection<V>(&self, name: &str) -> Result<KvCollection<V>>
    where
        V: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
    {
        let partition = self
            .keyspace
            .open_partition(name, PartitionCreateOptions::default())?;
        Ok(KvCollection {
            partition,
            _marker: PhantomData,
        })
    }
}

/// One partition of the [`KvStore`], exposed through the shared
/// [`Cache`] trait with string keys and JSON-encoded values.
pub struct KvCollection<V> {
    partition: PartitionHandle,
    _marker: PhantomData<V>,
}

#[async_trait]
impl<V> Cache<String, V> for KvCollection<V>
where
    V: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    async fn get(&self, key: &String) -> Option<V> {
        let res: Result<Option<V>> = (|| {
            if let Some(raw) = self.partition.get(key.as_bytes())? {
                let entry: CacheEntry<V> = serde_json::from_slice(&raw)?;
                if let Some(expires_at) = entry.expires_at {
                    if SystemTime::now() > expires_at {
                        debug!("Cache entry expired for key: {:?}", key);
                        self.partition.remove(key.as_bytes())?;
                        return Ok(None);
                    }
                }
                debug!("Cache HIT for key: {:?}", key);
                return Ok(Some(entry.value));
            }
            debug!("Cache MISS for key: {:?}", key);
            Ok(None)
        })();

        match res {
            Ok(val) => val,
            Err(e) => {
                debug!("KvCollection get error: {}", e);
                None
            }
        }
    }

    async fn put(&self, key: String, value: V, ttl: Option<Duration>) {
        let res: Result<()> = (|| {
            let expires_at = ttl.map(|d| SystemTime::now() + d);
            let entry = CacheEntry { value, expires_at };
            self.partition
                .insert(key.as_bytes(), serde_json::to_vec(&entry)?)?;
            debug!("Cache PUT for key: {:?}", key);
            Ok(())
        })();
        if let Err(e) = res {
            debug!("KvCollection put error: {}", e);
        }
    }

    async fn remove(&self, key: &String) {
        if let Err(e) = self.partition.remove(key.as_bytes()) {
            debug!("KvCollection remove error: {}", e);
        }
    }

    async fn clear(&self) {
        let keys: Vec<_> = self
            .partition
            .iter()
            .filter_map(|kv| kv.ok().map(|(k, _)| k))
            .collect();
        for key in keys {
            if let Err(e) = self.partition.remove(key) {
                debug!("KvCollection clear error: {}", e);
            }
        }
    }
}
