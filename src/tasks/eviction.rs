//! Idle Connection Eviction Task
//!
//! Background task that trims idle pooled connections down to `max_idle`
//! once per eviction interval.

use std::cell::Cell;
use std::time::Duration;

use deadpool_redis::Pool;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Spawns a background task that evicts idle connections above `max_idle`
/// from every pool.
pub fn spawn_eviction_task(pools: Vec<Pool>, max_idle: usize, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting idle connection eviction for {} pool(s) every {} ms, max_idle={}",
            pools.len(),
            interval.as_millis(),
            max_idle
        );

        loop {
            tokio::time::sleep(interval).await;

            let evicted: usize = pools.iter().map(|pool| trim_idle(pool, max_idle)).sum();
            if evicted > 0 {
                info!("Pool eviction: closed {} idle connections", evicted);
            } else {
                debug!("Pool eviction: no idle connections above max_idle");
            }
        }
    })
}

/// Drops idle connections until at most `max_idle` remain; returns how many
/// were dropped. Connections checked out by callers are never touched.
pub fn trim_idle(pool: &Pool, max_idle: usize) -> usize {
    let excess = pool.status().available.saturating_sub(max_idle);
    if excess == 0 {
        return 0;
    }

    let dropped = Cell::new(0usize);
    pool.retain(|_, _| {
        if dropped.get() < excess {
            dropped.set(dropped.get() + 1);
            false
        } else {
            true
        }
    });
    dropped.get()
}
