//! Store Module
//!
//! The key/value seam every higher layer writes through. Redis backs it in
//! production; the in-process store serves when Redis is disabled.

mod entry;
mod memory;
mod redis_store;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

pub use entry::{current_timestamp_ms, StoreEntry};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;

// == Key Value Store ==
/// String key to string value storage with optional per-entry expiry.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the value under `key`, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value and expiry.
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()>;

    /// Removes `key`, returning whether it existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Short backend name for logs and the health endpoint.
    fn backend(&self) -> &'static str;
}
