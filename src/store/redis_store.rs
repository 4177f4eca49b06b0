//! Redis Store
//!
//! [`KeyValueStore`] over the master-replica [`Topology`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

use super::KeyValueStore;
use crate::client::Topology;
use crate::error::Result;

#[derive(Clone)]
pub struct RedisStore {
    topology: Arc<Topology>,
}

impl RedisStore {
    pub fn new(topology: Arc<Topology>) -> Self {
        Self { topology }
    }

    pub fn topology(&self) -> &Arc<Topology> {
        &self.topology
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.topology.read_connection().await?;
        let value: Option<String> = self.topology.execute(conn.get(key)).await?;
        debug!("GET {} -> {}", key, if value.is_some() { "hit" } else { "miss" });
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.topology.write_connection().await?;
        match ttl {
            // SET EX rejects zero, so sub-second lifetimes round up
            Some(ttl) => {
                let seconds = ttl.as_secs().max(1);
                let _: () = self
                    .topology
                    .execute(conn.set_ex(key, value, seconds))
                    .await?;
                debug!("SET {} EX {}", key, seconds);
            }
            None => {
                let _: () = self.topology.execute(conn.set(key, value)).await?;
                debug!("SET {}", key);
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.topology.write_connection().await?;
        let removed: i64 = self.topology.execute(conn.del(key)).await?;
        Ok(removed > 0)
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Node, ReadFrom};
    use crate::config::NodeAddress;
    use crate::error::CacheError;
    use redis::{ConnectionAddr, ConnectionInfo};

    fn unreachable_store() -> RedisStore {
        let address = NodeAddress::new("127.0.0.1", 1);
        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(address.host.clone(), address.port),
            redis: Default::default(),
        };
        let primary = Node::shared(address, info, Duration::from_millis(200)).unwrap();
        let topology = Topology::new(primary, Vec::new(), ReadFrom::Master, None);
        RedisStore::new(Arc::new(topology))
    }

    #[tokio::test]
    async fn test_unreachable_redis_is_backend_error() {
        let store = unreachable_store();
        assert_eq!(store.backend(), "redis");

        let err = store.get("k").await.unwrap_err();
        assert!(err.is_backend());

        // The failed read leaves the primary backing off
        let err = store.set("k", "v".to_string(), None).await.unwrap_err();
        assert!(matches!(err, CacheError::NodeDown(_)));
    }
}
