//! Redis Facade - a key/value registration service backed by Redis
//!
//! Loads configuration from the environment, opens the Redis topology once
//! and serves the registration API until Ctrl+C or SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use redis_facade::api::{create_router, AppState};
use redis_facade::client::{ConnectionFactory, Topology};
use redis_facade::config::Config;
use redis_facade::store::{KeyValueStore, MemoryStore, RedisStore};
use redis_facade::tasks::{spawn_cleanup_task, spawn_eviction_task};

/// Interval between expiry sweeps of the in-memory store.
const MEMORY_CLEANUP_INTERVAL: Duration = Duration::from_secs(1);

/// Main entry point for the Redis facade server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load and validate configuration from environment variables
/// 3. Open the Redis topology (or the in-memory store when caching is disabled)
/// 4. Start background tasks
/// 5. Serve the API on the configured port
/// 6. On shutdown, abort background tasks and close pools
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "redis_facade=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Redis facade server");

    let config = Config::from_env().context("invalid configuration")?;
    info!(
        "Configuration loaded: port={}, redis={}:{}, enable={}, topology={:?}",
        config.server_port,
        config.redis.host,
        config.redis.port,
        config.cache.enable,
        config.cache.topology
    );

    let mut background: Vec<JoinHandle<()>> = Vec::new();
    let mut topology: Option<Arc<Topology>> = None;

    let store: Arc<dyn KeyValueStore> = if config.cache.enable {
        let factory = ConnectionFactory::from_config(&config)?;
        let opened = Arc::new(
            Topology::open(&factory)
                .await
                .context("failed to open Redis connections")?,
        );

        if let Some(pool) = factory.pool_config() {
            match pool.eviction_interval() {
                Some(interval) => {
                    background.push(spawn_eviction_task(opened.pools(), pool.max_idle, interval));
                    info!("Pool eviction task started");
                }
                None => info!("Pool eviction disabled"),
            }
        }

        topology = Some(Arc::clone(&opened));
        Arc::new(RedisStore::new(opened))
    } else {
        warn!("Caching disabled, using the in-memory store");
        let memory = Arc::new(MemoryStore::new());
        background.push(spawn_cleanup_task(
            Arc::clone(&memory),
            MEMORY_CLEANUP_INTERVAL,
        ));
        memory
    };

    let state = AppState::new(store, &config.cache);
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(background))
        .await
        .context("server error")?;

    if let Some(topology) = topology {
        topology.close();
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the background tasks.
async fn shutdown_signal(background: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    for handle in &background {
        handle.abort();
    }
    warn!("Aborted {} background task(s)", background.len());
}
