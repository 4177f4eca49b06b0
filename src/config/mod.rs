//! Configuration Module
//!
//! Handles loading and validating server and Redis configuration from
//! environment variables.

mod properties;

use std::env;
use std::fmt::Display;
use std::str::FromStr;

use thiserror::Error;

use crate::client::ReadFrom;

pub use properties::{
    CacheProperties, ClientOptionsSettings, KeepAliveSettings, NodeAddress, PoolSettings,
    ReplicaSettings, SocketSettings, TimeoutSettings, TimeoutStatus, TopologyMode,
    DEFAULT_COMMAND_TIMEOUT_MS, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_KEEP_ALIVE,
    DEFAULT_KEEP_ALIVE_COUNT, DEFAULT_KEEP_ALIVE_IDLE_HOURS, DEFAULT_KEEP_ALIVE_INTERVAL_SECS,
    DEFAULT_TCP_NO_DELAY, MAX_TIME_TO_LIVE_SECS,
};

// == Config Error ==
/// Startup configuration errors. All of them abort startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {name}: {reason}")]
    Invalid {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Pool invariant violated: {0}")]
    PoolInvariant(String),

    #[error("Master-replica topology requires at least one replica node")]
    MissingReplicaNodes,
}

// == Environment Variable Names ==
const SERVER_PORT: &str = "SERVER_PORT";

const REDIS_HOST: &str = "REDIS_HOST";
const REDIS_PORT: &str = "REDIS_PORT";
const REDIS_USERNAME: &str = "REDIS_USERNAME";
const REDIS_PASSWORD: &str = "REDIS_PASSWORD";
const REDIS_DATABASE: &str = "REDIS_DATABASE";

const CACHE_ENABLE: &str = "CACHE_ENABLE";
const CACHE_KEY_PREFIX: &str = "CACHE_KEY_PREFIX";
const CACHE_TIME_TO_LIVE: &str = "CACHE_TIME_TO_LIVE";
const CACHE_SSL_ENABLED: &str = "CACHE_SSL_ENABLED";
const CACHE_DISABLE_PEER_VERIFICATION: &str = "CACHE_DISABLE_PEER_VERIFICATION";
const CACHE_EAGER_INITIALIZATION: &str = "CACHE_EAGER_INITIALIZATION";
const CACHE_TOPOLOGY: &str = "CACHE_TOPOLOGY";

const REPLICA_READ_FROM: &str = "CACHE_REPLICA_READ_FROM";
const REPLICA_NODES: &str = "CACHE_REPLICA_NODES";

const TIMEOUT_ENABLE: &str = "CACHE_CLIENT_OPTIONS_TIMEOUT_ENABLE";
const TIMEOUT_TIMEOUT: &str = "CACHE_CLIENT_OPTIONS_TIMEOUT_TIMEOUT";
const SOCKET_CONNECTION_TIMEOUT: &str = "CACHE_CLIENT_OPTIONS_SOCKET_CONNECTION_TIMEOUT";
const SOCKET_TCP_NO_DELAY: &str = "CACHE_CLIENT_OPTIONS_SOCKET_TCP_NO_DELAY";
const KEEP_ALIVE_ENABLE: &str = "CACHE_CLIENT_OPTIONS_SOCKET_KEEP_ALIVE_ENABLE";
const KEEP_ALIVE_COUNT: &str = "CACHE_CLIENT_OPTIONS_SOCKET_KEEP_ALIVE_COUNT";
const KEEP_ALIVE_IDLE: &str = "CACHE_CLIENT_OPTIONS_SOCKET_KEEP_ALIVE_IDLE";
const KEEP_ALIVE_INTERVAL: &str = "CACHE_CLIENT_OPTIONS_SOCKET_KEEP_ALIVE_INTERVAL";

const POOL_ENABLED: &str = "CACHE_POOL_ENABLED";
const POOL_MAX_IDLE: &str = "CACHE_POOL_MAX_IDLE";
const POOL_MIN_IDLE: &str = "CACHE_POOL_MIN_IDLE";
const POOL_MAX_ACTIVE: &str = "CACHE_POOL_MAX_ACTIVE";
const POOL_MAX_WAIT: &str = "CACHE_POOL_MAX_WAIT";
const POOL_EVICTION_RUNS: &str = "CACHE_POOL_TIME_BETWEEN_EVICTION_RUNS";

// == Redis Server Settings ==
/// Address and credentials of the primary Redis node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisServerSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: i64,
}

impl Default for RedisServerSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            username: None,
            password: None,
            database: 0,
        }
    }
}

// == Config ==
/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Primary Redis node
    pub redis: RedisServerSettings,
    /// Cache, client option and pool settings
    pub cache: CacheProperties,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 8080,
            redis: RedisServerSettings::default(),
            cache: CacheProperties::default(),
        }
    }
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 8080)
    /// - `REDIS_HOST`, `REDIS_PORT`, `REDIS_USERNAME`, `REDIS_PASSWORD`, `REDIS_DATABASE`
    /// - `CACHE_*` - cache properties, see [`CacheProperties`]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads configuration through an arbitrary name lookup.
    ///
    /// Blank values count as unset. A section (replica, pool, client options
    /// and their nested parts) is present only when at least one of its
    /// variables is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = Source { lookup };
        let defaults = Config::default();

        let redis = RedisServerSettings {
            host: source.raw(REDIS_HOST).unwrap_or(defaults.redis.host),
            port: source.parse(REDIS_PORT)?.unwrap_or(defaults.redis.port),
            username: source.verbatim(REDIS_USERNAME),
            password: source.verbatim(REDIS_PASSWORD),
            database: source.parse(REDIS_DATABASE)?.unwrap_or(defaults.redis.database),
        };

        let replica = load_replica(&source)?;
        let topology = match source.parse::<TopologyMode>(CACHE_TOPOLOGY)? {
            Some(mode) => mode,
            None if replica.is_some() => TopologyMode::MasterReplica,
            None => TopologyMode::Standalone,
        };

        let base = CacheProperties::default();
        let cache = CacheProperties {
            enable: source.parse(CACHE_ENABLE)?.unwrap_or(base.enable),
            key_prefix: source.verbatim(CACHE_KEY_PREFIX).unwrap_or(base.key_prefix),
            time_to_live: source
                .parse(CACHE_TIME_TO_LIVE)?
                .unwrap_or(base.time_to_live),
            ssl_enabled: source.parse(CACHE_SSL_ENABLED)?.unwrap_or(base.ssl_enabled),
            disable_peer_verification: source
                .parse(CACHE_DISABLE_PEER_VERIFICATION)?
                .unwrap_or(base.disable_peer_verification),
            eager_initialization: source
                .parse(CACHE_EAGER_INITIALIZATION)?
                .unwrap_or(base.eager_initialization),
            topology,
            replica,
            client_options: load_client_options(&source)?,
            pool: load_pool(&source)?,
        };
        cache.validate()?;

        Ok(Self {
            server_port: source
                .parse(SERVER_PORT)?
                .unwrap_or(defaults.server_port),
            redis,
            cache,
        })
    }
}

fn load_replica<F>(source: &Source<F>) -> Result<Option<ReplicaSettings>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if !source.any(&[REPLICA_READ_FROM, REPLICA_NODES]) {
        return Ok(None);
    }
    let base = ReplicaSettings::default();
    let nodes = match source.raw(REPLICA_NODES) {
        Some(list) => list
            .split(',')
            .filter(|entry| !entry.trim().is_empty())
            .map(|entry| {
                entry.parse::<NodeAddress>().map_err(|reason| ConfigError::Invalid {
                    name: REPLICA_NODES.to_string(),
                    value: list.clone(),
                    reason,
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
        None => base.nodes,
    };
    Ok(Some(ReplicaSettings {
        read_from: source.parse(REPLICA_READ_FROM)?.unwrap_or(base.read_from),
        nodes,
    }))
}

fn load_client_options<F>(source: &Source<F>) -> Result<Option<ClientOptionsSettings>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let timeout = if source.any(&[TIMEOUT_ENABLE, TIMEOUT_TIMEOUT]) {
        let base = TimeoutSettings::default();
        Some(TimeoutSettings {
            enable: source.parse(TIMEOUT_ENABLE)?.unwrap_or(base.enable),
            timeout_ms: source.parse(TIMEOUT_TIMEOUT)?.unwrap_or(base.timeout_ms),
        })
    } else {
        None
    };

    let keep_alive = if source.any(&[
        KEEP_ALIVE_ENABLE,
        KEEP_ALIVE_COUNT,
        KEEP_ALIVE_IDLE,
        KEEP_ALIVE_INTERVAL,
    ]) {
        let base = KeepAliveSettings::default();
        Some(KeepAliveSettings {
            enable: source.parse(KEEP_ALIVE_ENABLE)?.unwrap_or(base.enable),
            count: source.parse(KEEP_ALIVE_COUNT)?.unwrap_or(base.count),
            idle_hours: source.parse(KEEP_ALIVE_IDLE)?.unwrap_or(base.idle_hours),
            interval_secs: source
                .parse(KEEP_ALIVE_INTERVAL)?
                .unwrap_or(base.interval_secs),
        })
    } else {
        None
    };

    let socket = if keep_alive.is_some()
        || source.any(&[SOCKET_CONNECTION_TIMEOUT, SOCKET_TCP_NO_DELAY])
    {
        let base = SocketSettings::default();
        Some(SocketSettings {
            connection_timeout_secs: source
                .parse(SOCKET_CONNECTION_TIMEOUT)?
                .unwrap_or(base.connection_timeout_secs),
            tcp_no_delay: source
                .parse(SOCKET_TCP_NO_DELAY)?
                .unwrap_or(base.tcp_no_delay),
            keep_alive,
        })
    } else {
        None
    };

    if timeout.is_none() && socket.is_none() {
        return Ok(None);
    }
    Ok(Some(ClientOptionsSettings { timeout, socket }))
}

fn load_pool<F>(source: &Source<F>) -> Result<Option<PoolSettings>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if !source.any(&[
        POOL_ENABLED,
        POOL_MAX_IDLE,
        POOL_MIN_IDLE,
        POOL_MAX_ACTIVE,
        POOL_MAX_WAIT,
        POOL_EVICTION_RUNS,
    ]) {
        return Ok(None);
    }
    let base = PoolSettings::default();
    Ok(Some(PoolSettings {
        enabled: source.parse(POOL_ENABLED)?.unwrap_or(base.enabled),
        max_idle: source.parse(POOL_MAX_IDLE)?.unwrap_or(base.max_idle),
        min_idle: source.parse(POOL_MIN_IDLE)?.unwrap_or(base.min_idle),
        max_active: source.parse(POOL_MAX_ACTIVE)?.unwrap_or(base.max_active),
        max_wait_ms: source.parse(POOL_MAX_WAIT)?.unwrap_or(base.max_wait_ms),
        // Non-positive intervals turn the evictor off
        time_between_eviction_runs_ms: source
            .parse::<i64>(POOL_EVICTION_RUNS)?
            .map(|ms| u64::try_from(ms).unwrap_or(0))
            .unwrap_or(base.time_between_eviction_runs_ms),
    }))
}

// == Lookup Source ==
struct Source<F> {
    lookup: F,
}

impl<F> Source<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// The value exactly as set, `None` when unset or blank.
    fn verbatim(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|value| !value.trim().is_empty())
    }

    fn raw(&self, name: &str) -> Option<String> {
        self.verbatim(name).map(|value| value.trim().to_string())
    }

    fn parse<T>(&self, name: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.raw(name)
            .map(|value| {
                value.parse::<T>().map_err(|e| ConfigError::Invalid {
                    name: name.to_string(),
                    value: value.clone(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    fn any(&self, names: &[&str]) -> bool {
        names.iter().any(|name| self.raw(name).is_some())
    }
}
