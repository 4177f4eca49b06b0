//! Redis Facade - a key/value registration service backed by Redis
//!
//! Stores tagged JSON records in Redis through a standalone or
//! master-replica topology, with optional pooling, TLS and command timeouts.

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod service;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use error::{CacheError, Result};
pub use service::KeyValueService;
pub use tasks::{spawn_cleanup_task, spawn_eviction_task};
