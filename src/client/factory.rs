//! Connection Factory
//!
//! Turns [`Config`] into a [`ConnectionFactory`]: pool choice, TLS,
//! customization, client options and finally the node topology, in that
//! order. Runs once at startup.

use std::time::Duration;

use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use tracing::{debug, info};

use crate::config::{CacheProperties, Config, ConfigError, NodeAddress, PoolSettings, TopologyMode};

use super::{ClientOptions, ReadFrom};

// == Pool Config ==
/// Pool parameters handed to the pooled connection builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_total: usize,
    pub max_idle: usize,
    pub min_idle: usize,
    pub max_wait: Duration,
    pub time_between_eviction_runs: Duration,
}

impl From<&PoolSettings> for PoolConfig {
    fn from(settings: &PoolSettings) -> Self {
        Self {
            max_total: settings.max_active,
            max_idle: settings.max_idle,
            min_idle: settings.min_idle,
            max_wait: Duration::from_millis(settings.max_wait_ms),
            time_between_eviction_runs: Duration::from_millis(
                settings.time_between_eviction_runs_ms,
            ),
        }
    }
}

impl PoolConfig {
    /// Interval of the idle evictor, `None` when eviction runs are off.
    pub fn eviction_interval(&self) -> Option<Duration> {
        Some(self.time_between_eviction_runs).filter(|interval| !interval.is_zero())
    }
}

/// Whether node connections are pooled or a single shared multiplexed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    Shared,
    Pooled(PoolConfig),
}

// == Client Configuration ==
/// Resolved client behaviour shared by every node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfiguration {
    pub mode: ConnectionMode,
    pub use_tls: bool,
    pub verify_peer: bool,
    pub read_from: ReadFrom,
    pub client_options: ClientOptions,
}

impl ClientConfiguration {
    /// Starts a builder for shared (non-pooled) connections.
    pub fn builder() -> ClientConfigurationBuilder {
        info!("Client configuration: shared connection builder");
        ClientConfigurationBuilder::new(ConnectionMode::Shared)
    }

    /// Starts a builder for pooled connections.
    pub fn pooling_builder(pool: PoolConfig) -> ClientConfigurationBuilder {
        info!(
            "Client configuration: pooling builder (max_total={}, max_idle={}, min_idle={}, max_wait={:?})",
            pool.max_total, pool.max_idle, pool.min_idle, pool.max_wait
        );
        ClientConfigurationBuilder::new(ConnectionMode::Pooled(pool))
    }
}

/// Builder for [`ClientConfiguration`]. Peer verification defaults to on.
#[derive(Debug, Clone)]
pub struct ClientConfigurationBuilder {
    mode: ConnectionMode,
    use_tls: bool,
    verify_peer: bool,
    read_from: ReadFrom,
    client_options: ClientOptions,
}

impl ClientConfigurationBuilder {
    fn new(mode: ConnectionMode) -> Self {
        Self {
            mode,
            use_tls: false,
            verify_peer: true,
            read_from: ReadFrom::Master,
            client_options: ClientOptions::default(),
        }
    }

    pub fn use_tls(mut self) -> Self {
        self.use_tls = true;
        self
    }

    /// Only meaningful once TLS is on.
    pub fn disable_peer_verification(mut self) -> Self {
        self.verify_peer = false;
        self
    }

    pub fn read_from(mut self, read_from: ReadFrom) -> Self {
        self.read_from = read_from;
        self
    }

    pub fn client_options(mut self, client_options: ClientOptions) -> Self {
        self.client_options = client_options;
        self
    }

    pub fn is_use_tls(&self) -> bool {
        self.use_tls
    }

    pub fn build(self) -> ClientConfiguration {
        ClientConfiguration {
            mode: self.mode,
            use_tls: self.use_tls,
            verify_peer: self.verify_peer,
            read_from: self.read_from,
            client_options: self.client_options,
        }
    }
}

// == Topology Configuration ==
/// Primary node, credentials and replica endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyConfiguration {
    pub primary: NodeAddress,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: i64,
    pub replicas: Vec<NodeAddress>,
}

// == Connection Factory ==
/// Everything needed to open the node connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionFactory {
    pub topology: TopologyConfiguration,
    pub client: ClientConfiguration,
    pub eager_initialization: bool,
}

impl ConnectionFactory {
    /// Runs the builder pipeline over the loaded configuration.
    ///
    /// Fails when master-replica mode is selected without replica nodes.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let cache = &config.cache;
        let client = client_configuration(cache);

        let mut replicas = Vec::new();
        match cache.topology {
            TopologyMode::MasterReplica => {
                let nodes = cache
                    .replica
                    .as_ref()
                    .map(|replica| replica.nodes.as_slice())
                    .filter(|nodes| !nodes.is_empty())
                    .ok_or(ConfigError::MissingReplicaNodes)?;
                debug!("Connection factory topology: master-replica");
                replicas.extend(nodes.iter().cloned());
            }
            TopologyMode::Standalone => {
                debug!("Connection factory topology: standalone");
            }
        }

        let topology = TopologyConfiguration {
            primary: NodeAddress::new(config.redis.host.clone(), config.redis.port),
            username: config.redis.username.clone(),
            password: config.redis.password.clone(),
            database: config.redis.database,
            replicas,
        };
        info!(
            "Connection factory: primary={}, replicas={}, tls={}, read_from={}",
            topology.primary,
            topology.replicas.len(),
            client.use_tls,
            client.read_from
        );

        Ok(Self {
            topology,
            client,
            eager_initialization: cache.eager_initialization,
        })
    }

    /// Connection parameters for one node of the topology.
    pub fn connection_info(&self, node: &NodeAddress) -> ConnectionInfo {
        let addr = if self.client.use_tls {
            ConnectionAddr::TcpTls {
                host: node.host.clone(),
                port: node.port,
                insecure: !self.client.verify_peer,
                tls_params: None,
            }
        } else {
            ConnectionAddr::Tcp(node.host.clone(), node.port)
        };

        ConnectionInfo {
            addr,
            redis: RedisConnectionInfo {
                db: self.topology.database,
                username: self.topology.username.clone(),
                password: self.topology.password.clone(),
                ..Default::default()
            },
        }
    }

    /// Pool parameters when pooling is on.
    pub fn pool_config(&self) -> Option<PoolConfig> {
        match self.client.mode {
            ConnectionMode::Pooled(pool) => Some(pool),
            ConnectionMode::Shared => None,
        }
    }
}

fn client_configuration(cache: &CacheProperties) -> ClientConfiguration {
    let mut builder = match cache.pool.as_ref() {
        Some(pool) if pool.enabled => {
            ClientConfiguration::pooling_builder(PoolConfig::from(pool))
        }
        _ => ClientConfiguration::builder(),
    };

    if cache.ssl_enabled {
        builder = builder.use_tls();
    }
    builder = customize(builder, cache);
    builder
        .client_options(ClientOptions::from_settings(cache.client_options.as_ref()))
        .build()
}

/// Peer verification and read policy adjustments applied after TLS selection.
fn customize(
    mut builder: ClientConfigurationBuilder,
    cache: &CacheProperties,
) -> ClientConfigurationBuilder {
    if builder.is_use_tls() && cache.disable_peer_verification {
        builder = builder.disable_peer_verification();
    }

    let read_from = match cache.topology {
        TopologyMode::MasterReplica => cache
            .replica
            .as_ref()
            .map(|replica| replica.read_from)
            .unwrap_or_default(),
        TopologyMode::Standalone => ReadFrom::Master,
    };
    debug!("Master-replica read_from: {}", read_from);
    builder.read_from(read_from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::TimeoutPolicy;
    use crate::config::{ClientOptionsSettings, ReplicaSettings, TimeoutSettings};

    fn master_replica_config() -> Config {
        let mut config = Config::default();
        config.cache.topology = TopologyMode::MasterReplica;
        config.cache.replica = Some(ReplicaSettings {
            read_from: ReadFrom::ReplicaPreferred,
            nodes: vec![NodeAddress::new("r1", 6379), NodeAddress::new("r2", 6380)],
        });
        config
    }

    #[test]
    fn test_zero_eviction_interval_disables_evictor() {
        let mut settings = PoolSettings {
            enabled: true,
            ..Default::default()
        };
        assert_eq!(
            PoolConfig::from(&settings).eviction_interval(),
            Some(Duration::from_millis(1_800_000))
        );

        settings.time_between_eviction_runs_ms = 0;
        assert_eq!(PoolConfig::from(&settings).eviction_interval(), None);
    }

    #[test]
    fn test_pool_disabled_uses_shared_builder() {
        let mut config = Config::default();
        config.cache.pool = Some(PoolSettings::default());
        let factory = ConnectionFactory::from_config(&config).unwrap();
        assert_eq!(factory.client.mode, ConnectionMode::Shared);
        assert!(factory.pool_config().is_none());

        config.cache.pool = None;
        let factory = ConnectionFactory::from_config(&config).unwrap();
        assert_eq!(factory.client.mode, ConnectionMode::Shared);
    }

    #[test]
    fn test_pool_enabled_maps_parameters() {
        let mut config = Config::default();
        config.cache.pool = Some(PoolSettings {
            enabled: true,
            max_idle: 4,
            min_idle: 4,
            max_active: 4,
            max_wait_ms: 5000,
            ..Default::default()
        });
        let factory = ConnectionFactory::from_config(&config).unwrap();
        let pool = factory.pool_config().unwrap();
        assert_eq!(pool.max_total, 4);
        assert_eq!(pool.max_idle, 4);
        assert_eq!(pool.min_idle, 4);
        assert_eq!(pool.max_wait, Duration::from_millis(5000));
        assert_eq!(pool.time_between_eviction_runs, Duration::from_secs(1800));
    }

    #[test]
    fn test_tls_with_peer_verification_disabled() {
        let mut config = Config::default();
        config.cache.ssl_enabled = true;
        config.cache.disable_peer_verification = true;
        let factory = ConnectionFactory::from_config(&config).unwrap();
        assert!(factory.client.use_tls);
        assert!(!factory.client.verify_peer);

        let info = factory.connection_info(&factory.topology.primary);
        assert!(matches!(
            info.addr,
            ConnectionAddr::TcpTls { insecure: true, .. }
        ));
    }

    #[test]
    fn test_tls_with_peer_verification_kept() {
        let mut config = Config::default();
        config.cache.ssl_enabled = true;
        config.cache.disable_peer_verification = false;
        let factory = ConnectionFactory::from_config(&config).unwrap();
        assert!(factory.client.use_tls);
        assert!(factory.client.verify_peer);

        let info = factory.connection_info(&factory.topology.primary);
        assert!(matches!(
            info.addr,
            ConnectionAddr::TcpTls { insecure: false, .. }
        ));
    }

    #[test]
    fn test_peer_verification_untouched_without_tls() {
        let config = Config::default();
        let factory = ConnectionFactory::from_config(&config).unwrap();
        assert!(!factory.client.use_tls);
        assert!(factory.client.verify_peer);
        let info = factory.connection_info(&factory.topology.primary);
        assert!(matches!(info.addr, ConnectionAddr::Tcp(ref host, 6379) if host == "localhost"));
    }

    #[test]
    fn test_master_replica_topology() {
        let mut config = master_replica_config();
        config.redis.username = Some("app".into());
        config.redis.password = Some("secret".into());
        let factory = ConnectionFactory::from_config(&config).unwrap();

        assert_eq!(factory.topology.primary, NodeAddress::new("localhost", 6379));
        assert_eq!(
            factory.topology.replicas,
            vec![NodeAddress::new("r1", 6379), NodeAddress::new("r2", 6380)]
        );
        assert_eq!(factory.client.read_from, ReadFrom::ReplicaPreferred);

        let info = factory.connection_info(&factory.topology.replicas[1]);
        assert_eq!(info.redis.username.as_deref(), Some("app"));
        assert_eq!(info.redis.password.as_deref(), Some("secret"));
        assert!(matches!(info.addr, ConnectionAddr::Tcp(ref host, 6380) if host == "r2"));
    }

    #[test]
    fn test_master_replica_without_nodes_fails() {
        let mut config = master_replica_config();
        config.cache.replica = None;
        assert_eq!(
            ConnectionFactory::from_config(&config),
            Err(ConfigError::MissingReplicaNodes)
        );

        let mut config = master_replica_config();
        config.cache.replica = Some(ReplicaSettings::default());
        assert_eq!(
            ConnectionFactory::from_config(&config),
            Err(ConfigError::MissingReplicaNodes)
        );
    }

    #[test]
    fn test_standalone_ignores_replicas() {
        let mut config = master_replica_config();
        config.cache.topology = TopologyMode::Standalone;
        let factory = ConnectionFactory::from_config(&config).unwrap();
        assert!(factory.topology.replicas.is_empty());
        assert_eq!(factory.client.read_from, ReadFrom::Master);
    }

    #[test]
    fn test_client_options_attached() {
        let mut config = Config::default();
        config.cache.client_options = Some(ClientOptionsSettings {
            timeout: Some(TimeoutSettings {
                enable: true,
                timeout_ms: 200,
            }),
            socket: None,
        });
        config.cache.eager_initialization = true;
        let factory = ConnectionFactory::from_config(&config).unwrap();
        assert_eq!(
            factory.client.client_options.timeout,
            TimeoutPolicy::EnabledFixed(Duration::from_millis(200))
        );
        assert!(factory.eager_initialization);
    }
}
