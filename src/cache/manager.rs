//! Cache Manager
//!
//! Named caches over a [`KeyValueStore`]. Each cache has its own entry
//! lifetime; keys are stored as `<prefix><cache name>::<key>`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use super::codec::{self, Tagged};
use crate::error::{CacheError, Result};
use crate::store::KeyValueStore;

// == Cache Keys ==
/// Default entry lifetime in seconds.
pub const DEFAULT_EXPIRE_SECS: u64 = 60;
/// Name of the short-lived zone cache.
pub const ZONE: &str = "zone";
/// Entry lifetime of the zone cache in seconds.
pub const ZONE_EXPIRE_SECS: u64 = 30;

// == Cache Configuration ==
/// Per-cache settings. Null values are never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfiguration {
    /// Entry lifetime, `None` keeps entries until evicted
    pub ttl: Option<Duration>,
    /// Prefix placed before the cache name
    pub key_prefix: String,
}

impl Default for CacheConfiguration {
    fn default() -> Self {
        Self {
            ttl: Some(Duration::from_secs(DEFAULT_EXPIRE_SECS)),
            key_prefix: String::new(),
        }
    }
}

impl CacheConfiguration {
    pub fn entry_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn prefix_keys_with(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Storage key for `key` in the cache called `name`.
    pub fn compute_key(&self, name: &str, key: &str) -> String {
        format!("{}{}::{}", self.key_prefix, name, key)
    }
}

// == Cache Manager ==
pub struct CacheManager {
    store: Arc<dyn KeyValueStore>,
    defaults: CacheConfiguration,
    initial: HashMap<String, CacheConfiguration>,
}

impl CacheManager {
    pub fn new(store: Arc<dyn KeyValueStore>, defaults: CacheConfiguration) -> Self {
        Self {
            store,
            defaults,
            initial: HashMap::new(),
        }
    }

    /// Registers a cache whose settings differ from the defaults.
    pub fn with_cache_configuration(
        mut self,
        name: impl Into<String>,
        configuration: CacheConfiguration,
    ) -> Self {
        self.initial.insert(name.into(), configuration);
        self
    }

    /// The standard layout: 60 second defaults and a 30 second `zone` cache.
    pub fn standard(store: Arc<dyn KeyValueStore>, key_prefix: &str) -> Self {
        let defaults = CacheConfiguration::default().prefix_keys_with(key_prefix);
        let zone = defaults
            .clone()
            .entry_ttl(Duration::from_secs(ZONE_EXPIRE_SECS));
        info!(
            "Cache manager: default ttl={}s, '{}' ttl={}s",
            DEFAULT_EXPIRE_SECS, ZONE, ZONE_EXPIRE_SECS
        );
        Self::new(store, defaults).with_cache_configuration(ZONE, zone)
    }

    /// Returns the cache called `name`, using defaults when it has no own settings.
    pub fn cache(&self, name: &str) -> Cache {
        let configuration = self
            .initial
            .get(name)
            .cloned()
            .unwrap_or_else(|| self.defaults.clone());
        Cache {
            name: name.to_string(),
            configuration,
            store: Arc::clone(&self.store),
        }
    }

    /// Names of caches with their own settings.
    pub fn cache_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.initial.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

// == Cache ==
/// Handle to one named cache.
#[derive(Clone)]
pub struct Cache {
    name: String,
    configuration: CacheConfiguration,
    store: Arc<dyn KeyValueStore>,
}

impl Cache {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.configuration.ttl
    }

    pub async fn get<T: Tagged>(&self, key: &str) -> Result<Option<T>> {
        let storage_key = self.configuration.compute_key(&self.name, key);
        match self.store.get(&storage_key).await? {
            Some(raw) => Ok(Some(codec::decode(&raw)?)),
            None => Ok(None),
        }
    }

    /// Stores `value` for the cache's lifetime. `None` is rejected.
    pub async fn put<T: Tagged>(&self, key: &str, value: Option<&T>) -> Result<()> {
        let value = value.ok_or_else(|| CacheError::NullValue(self.name.clone()))?;
        let storage_key = self.configuration.compute_key(&self.name, key);
        let raw = codec::encode(value)?;
        self.store
            .set(&storage_key, raw, self.configuration.ttl)
            .await?;
        debug!("Cached {} (ttl={:?})", storage_key, self.configuration.ttl);
        Ok(())
    }

    pub async fn evict(&self, key: &str) -> Result<bool> {
        let storage_key = self.configuration.compute_key(&self.name, key);
        self.store.delete(&storage_key).await
    }
}
