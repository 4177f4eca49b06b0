//! Cache Properties
//!
//! Immutable configuration values for the Redis connection, client options
//! and connection pool. Built once at startup by [`super::Config::from_env`].

use std::fmt;
use std::str::FromStr;

use crate::client::ReadFrom;

use super::ConfigError;

// == Library Defaults ==
/// Default command timeout applied when timeouts are enabled without a fixed value.
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 60_000;
/// Default socket connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// TCP no-delay is on unless configured otherwise.
pub const DEFAULT_TCP_NO_DELAY: bool = true;
/// TCP keepalive is off unless configured otherwise.
pub const DEFAULT_KEEP_ALIVE: bool = false;
/// Maximum number of keepalive probes.
pub const DEFAULT_KEEP_ALIVE_COUNT: u32 = 9;
/// Idle time before the first keepalive probe, in hours.
pub const DEFAULT_KEEP_ALIVE_IDLE_HOURS: u64 = 2;
/// Time between keepalive probes, in seconds.
pub const DEFAULT_KEEP_ALIVE_INTERVAL_SECS: u64 = 75;
/// Longest record lifetime in seconds. Redis stores expiries as absolute
/// Unix milliseconds in an i64, so the lifetime plus the current time must fit.
pub const MAX_TIME_TO_LIVE_SECS: i64 = i64::MAX / 2000;

// == Cache Properties ==
/// Root configuration for the caching facade.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheProperties {
    /// When false the service runs on the in-process store instead of Redis
    pub enable: bool,
    /// Prefix prepended to every stored key
    pub key_prefix: String,
    /// Record lifetime in seconds, -1 (or any value <= 0) means unbounded
    pub time_to_live: i64,
    /// Connect to Redis over TLS
    pub ssl_enabled: bool,
    /// Skip certificate verification when TLS is on
    pub disable_peer_verification: bool,
    /// Open every node connection at startup
    pub eager_initialization: bool,
    pub topology: TopologyMode,
    pub replica: Option<ReplicaSettings>,
    pub client_options: Option<ClientOptionsSettings>,
    pub pool: Option<PoolSettings>,
}

impl Default for CacheProperties {
    fn default() -> Self {
        Self {
            enable: true,
            key_prefix: String::new(),
            time_to_live: -1,
            ssl_enabled: false,
            disable_peer_verification: true,
            eager_initialization: false,
            topology: TopologyMode::Standalone,
            replica: None,
            client_options: None,
            pool: None,
        }
    }
}

impl CacheProperties {
    /// Checks cross-field invariants that cannot be expressed in the types.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.time_to_live > MAX_TIME_TO_LIVE_SECS {
            return Err(ConfigError::Invalid {
                name: "CACHE_TIME_TO_LIVE".to_string(),
                value: self.time_to_live.to_string(),
                reason: format!("must not exceed {MAX_TIME_TO_LIVE_SECS} seconds"),
            });
        }
        if let Some(pool) = &self.pool {
            pool.validate()?;
        }
        Ok(())
    }
}

// == Topology Mode ==
/// How the primary node and replicas are arranged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyMode {
    /// A single primary serves reads and writes
    Standalone,
    /// Writes go to the primary, reads follow the replica read policy
    MasterReplica,
}

impl FromStr for TopologyMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().replace('_', "-").as_str() {
            "standalone" => Ok(Self::Standalone),
            "master-replica" | "masterreplica" => Ok(Self::MasterReplica),
            _ => Err(format!("unknown topology mode: {value}")),
        }
    }
}

// == Replica Settings ==
/// Replica nodes and the policy used to pick a read target.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicaSettings {
    pub read_from: ReadFrom,
    pub nodes: Vec<NodeAddress>,
}

impl Default for ReplicaSettings {
    fn default() -> Self {
        Self {
            read_from: ReadFrom::ReplicaPreferred,
            nodes: Vec::new(),
        }
    }
}

/// A `host:port` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAddress {
    pub host: String,
    pub port: u16,
}

impl NodeAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl FromStr for NodeAddress {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (host, port) = value
            .trim()
            .rsplit_once(':')
            .ok_or_else(|| format!("expected host:port, got '{value}'"))?;
        if host.is_empty() {
            return Err(format!("missing host in '{value}'"));
        }
        let port = port
            .parse::<u16>()
            .map_err(|e| format!("invalid port in '{value}': {e}"))?;
        Ok(Self::new(host, port))
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// == Pool Settings ==
/// Connection pool sizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    pub enabled: bool,
    pub max_idle: usize,
    pub min_idle: usize,
    pub max_active: usize,
    /// How long a caller waits for a free connection, in milliseconds
    pub max_wait_ms: u64,
    /// Interval of the idle eviction task, in milliseconds
    pub time_between_eviction_runs_ms: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            max_idle: 4,
            min_idle: 4,
            max_active: 4,
            max_wait_ms: 5_000,
            time_between_eviction_runs_ms: 30 * 60 * 1_000,
        }
    }
}

impl PoolSettings {
    /// Enforces `min_idle <= max_idle <= max_active`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_active == 0 {
            return Err(ConfigError::PoolInvariant(
                "maxActive must be at least 1".to_string(),
            ));
        }
        if self.max_idle > self.max_active {
            return Err(ConfigError::PoolInvariant(format!(
                "maxIdle ({}) exceeds maxActive ({})",
                self.max_idle, self.max_active
            )));
        }
        if self.min_idle > self.max_idle {
            return Err(ConfigError::PoolInvariant(format!(
                "minIdle ({}) exceeds maxIdle ({})",
                self.min_idle, self.max_idle
            )));
        }
        Ok(())
    }
}

// == Client Option Settings ==
/// Client option overrides. Absent sections fall back to library defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientOptionsSettings {
    pub timeout: Option<TimeoutSettings>,
    pub socket: Option<SocketSettings>,
}

/// Command timeout settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutSettings {
    pub enable: bool,
    /// Fixed timeout in milliseconds, negative means library default
    pub timeout_ms: i64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            enable: true,
            timeout_ms: -1,
        }
    }
}

/// Resolved state of [`TimeoutSettings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutStatus {
    Disabled,
    EnabledDefault,
    EnabledFixed,
}

impl TimeoutSettings {
    pub fn status(&self) -> TimeoutStatus {
        if !self.enable {
            TimeoutStatus::Disabled
        } else if self.timeout_ms >= 0 {
            TimeoutStatus::EnabledFixed
        } else {
            TimeoutStatus::EnabledDefault
        }
    }
}

/// Low-level socket settings for node connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketSettings {
    pub connection_timeout_secs: u64,
    pub tcp_no_delay: bool,
    pub keep_alive: Option<KeepAliveSettings>,
}

impl Default for SocketSettings {
    fn default() -> Self {
        Self {
            connection_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            tcp_no_delay: DEFAULT_TCP_NO_DELAY,
            keep_alive: None,
        }
    }
}

/// TCP keepalive settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAliveSettings {
    pub enable: bool,
    pub count: u32,
    pub idle_hours: u64,
    pub interval_secs: u64,
}

impl Default for KeepAliveSettings {
    fn default() -> Self {
        Self {
            enable: DEFAULT_KEEP_ALIVE,
            count: DEFAULT_KEEP_ALIVE_COUNT,
            idle_hours: DEFAULT_KEEP_ALIVE_IDLE_HOURS,
            interval_secs: DEFAULT_KEEP_ALIVE_INTERVAL_SECS,
        }
    }
}
