//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - TTL Cleanup: Removes expired entries from the in-memory store
//! - Pool Eviction: Closes idle pooled Redis connections above `max_idle`

mod cleanup;
mod eviction;

pub use cleanup::spawn_cleanup_task;
pub use eviction::{spawn_eviction_task, trim_idle};
