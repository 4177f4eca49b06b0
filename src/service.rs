//! Key/Value Service
//!
//! Registers and retrieves [`Record`]s, one per key. Failures are logged and
//! returned so callers can tell a missing key from an unreachable backend.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error};

use crate::cache::codec;
use crate::config::CacheProperties;
use crate::error::Result;
use crate::models::Record;
use crate::store::KeyValueStore;

#[derive(Clone)]
pub struct KeyValueService {
    store: Arc<dyn KeyValueStore>,
    key_prefix: String,
    ttl: Option<Duration>,
}

impl KeyValueService {
    /// Records expire after `time_to_live` seconds when it is positive.
    pub fn new(store: Arc<dyn KeyValueStore>, properties: &CacheProperties) -> Self {
        let ttl = u64::try_from(properties.time_to_live)
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        Self {
            store,
            key_prefix: properties.key_prefix.clone(),
            ttl,
        }
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    fn storage_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    /// Stores `record` under its key, replacing any previous record.
    pub async fn register(&self, record: &Record) -> Result<()> {
        let storage_key = self.storage_key(&record.key);
        let raw = codec::encode(record)
            .inspect_err(|err| error!("Failed to encode record {}: {}", storage_key, err))?;

        self.store
            .set(&storage_key, raw, self.ttl)
            .await
            .inspect_err(|err| error!("Failed to register key {}: {}", storage_key, err))?;
        debug!("Registered key {}", storage_key);
        Ok(())
    }

    /// Fetches the record under `key`; `Ok(None)` when nothing is stored.
    pub async fn retrieve(&self, key: &str) -> Result<Option<Record>> {
        let storage_key = self.storage_key(key);
        let raw = self
            .store
            .get(&storage_key)
            .await
            .inspect_err(|err| error!("Failed to retrieve key {}: {}", storage_key, err))?;

        match raw {
            Some(raw) => {
                let record = codec::decode::<Record>(&raw)
                    .inspect_err(|err| error!("Failed to decode key {}: {}", storage_key, err))?;
                Ok(Some(record))
            }
            None => {
                debug!("Key {} not found", storage_key);
                Ok(None)
            }
        }
    }
}
