//! Cache Module
//!
//! Named caches with per-cache entry lifetimes and type-tagged JSON values.

pub mod codec;
mod manager;

// Re-export public types
pub use codec::Tagged;
pub use manager::{
    Cache, CacheConfiguration, CacheManager, DEFAULT_EXPIRE_SECS, ZONE, ZONE_EXPIRE_SECS,
};
