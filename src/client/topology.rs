//! Node Topology
//!
//! Live connections to the primary and replica nodes. Writes always go to
//! the primary; reads walk the read-from candidates and use the first node
//! that hands out a connection. A node whose connect fails is skipped for
//! [`NODE_DOWN_BACKOFF`] before it is tried again.

use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use deadpool_redis::{Manager, Pool, PoolError, Runtime, TimeoutType};
use redis::aio::{ConnectionLike, ConnectionManager, ConnectionManagerConfig};
use redis::{Client, Cmd, ConnectionInfo, Pipeline, RedisFuture, RedisResult, Value};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::NodeAddress;
use crate::error::{CacheError, Result};

use super::{ConnectionFactory, NodeRef, PoolConfig, ReadFrom};

/// How long a node is skipped after a failed connect.
pub const NODE_DOWN_BACKOFF: Duration = Duration::from_secs(5);

// == Node Connection ==
/// A connection checked out from a node, pooled or shared.
pub enum NodeConnection {
    Pooled(deadpool_redis::Connection),
    Shared(ConnectionManager),
}

impl ConnectionLike for NodeConnection {
    fn req_packed_command<'a>(&'a mut self, cmd: &'a Cmd) -> RedisFuture<'a, Value> {
        match self {
            NodeConnection::Pooled(conn) => conn.req_packed_command(cmd),
            NodeConnection::Shared(conn) => conn.req_packed_command(cmd),
        }
    }

    fn req_packed_commands<'a>(
        &'a mut self,
        cmd: &'a Pipeline,
        offset: usize,
        count: usize,
    ) -> RedisFuture<'a, Vec<Value>> {
        match self {
            NodeConnection::Pooled(conn) => conn.req_packed_commands(cmd, offset, count),
            NodeConnection::Shared(conn) => conn.req_packed_commands(cmd, offset, count),
        }
    }

    fn get_db(&self) -> i64 {
        match self {
            NodeConnection::Pooled(conn) => conn.get_db(),
            NodeConnection::Shared(conn) => conn.get_db(),
        }
    }
}

// == Node ==
enum NodeHandle {
    Pooled(Pool),
    Shared {
        client: Client,
        connection: OnceCell<ConnectionManager>,
        connect_timeout: Duration,
    },
}

/// One Redis endpoint of the topology.
pub struct Node {
    address: NodeAddress,
    handle: NodeHandle,
    epoch: Instant,
    /// Milliseconds since `epoch` until which the node is skipped, 0 when up
    down_until_ms: AtomicU64,
}

impl Node {
    /// A node served by one lazily opened multiplexed connection.
    pub fn shared(
        address: NodeAddress,
        info: ConnectionInfo,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::open(info)?;
        Ok(Self::with_handle(
            address,
            NodeHandle::Shared {
                client,
                connection: OnceCell::new(),
                connect_timeout,
            },
        ))
    }

    /// A node served by a bounded connection pool.
    pub fn pooled(
        address: NodeAddress,
        info: ConnectionInfo,
        pool: &PoolConfig,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let manager = Manager::new(info)?;
        let pool = Pool::builder(manager)
            .max_size(pool.max_total)
            .wait_timeout(Some(pool.max_wait))
            .create_timeout(Some(connect_timeout))
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| CacheError::Internal(format!("failed to build pool for {address}: {e}")))?;
        Ok(Self::with_handle(address, NodeHandle::Pooled(pool)))
    }

    fn with_handle(address: NodeAddress, handle: NodeHandle) -> Self {
        Self {
            address,
            handle,
            epoch: Instant::now(),
            down_until_ms: AtomicU64::new(0),
        }
    }

    pub fn address(&self) -> &NodeAddress {
        &self.address
    }

    /// Checks out a connection, opening the shared one on first use.
    ///
    /// Fails fast with [`CacheError::NodeDown`] while the node is backing off
    /// from a failed connect.
    pub async fn connection(&self) -> Result<NodeConnection> {
        if self.is_down() {
            return Err(CacheError::NodeDown(self.address.to_string()));
        }

        let result = self.open_connection().await;
        match &result {
            Ok(_) => self.down_until_ms.store(0, Ordering::Relaxed),
            Err(err) if is_connect_failure(err) => self.mark_down(),
            Err(_) => {}
        }
        result
    }

    /// True while the node is skipped after a failed connect.
    pub fn is_down(&self) -> bool {
        let until = self.down_until_ms.load(Ordering::Relaxed);
        until != 0 && self.elapsed_ms() < until
    }

    fn mark_down(&self) {
        let backoff = u64::try_from(NODE_DOWN_BACKOFF.as_millis()).unwrap_or(u64::MAX);
        let until = self.elapsed_ms().saturating_add(backoff).max(1);
        self.down_until_ms.store(until, Ordering::Relaxed);
        warn!(
            "Node {} marked down for {:?} after a failed connect",
            self.address, NODE_DOWN_BACKOFF
        );
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    async fn open_connection(&self) -> Result<NodeConnection> {
        match &self.handle {
            NodeHandle::Pooled(pool) => Ok(NodeConnection::Pooled(pool.get().await?)),
            NodeHandle::Shared {
                client,
                connection,
                connect_timeout,
            } => {
                let manager = connection
                    .get_or_try_init(|| async {
                        debug!("Opening connection to {}", self.address);
                        // One attempt per call; failures are retried after the backoff
                        let config = ConnectionManagerConfig::new()
                            .set_number_of_retries(0)
                            .set_connection_timeout(*connect_timeout);
                        let opened = tokio::time::timeout(
                            *connect_timeout,
                            client.get_connection_manager_with_config(config),
                        )
                        .await
                        .map_err(|_| CacheError::Timeout(*connect_timeout))?;
                        Ok::<_, CacheError>(opened?)
                    })
                    .await?;
                Ok(NodeConnection::Shared(manager.clone()))
            }
        }
    }

    /// Opens connections up front: the shared connection, or `idle` pooled ones.
    async fn warm(&self, idle: usize) -> Result<()> {
        match &self.handle {
            NodeHandle::Pooled(pool) => {
                let mut held = Vec::with_capacity(idle);
                for _ in 0..idle.max(1) {
                    held.push(pool.get().await?);
                }
                debug!("Warmed {} pooled connections to {}", held.len(), self.address);
            }
            NodeHandle::Shared { .. } => {
                self.connection().await?;
            }
        }
        Ok(())
    }

    fn pool(&self) -> Option<&Pool> {
        match &self.handle {
            NodeHandle::Pooled(pool) => Some(pool),
            NodeHandle::Shared { .. } => None,
        }
    }
}

// == Topology ==
/// Primary plus replicas with read routing and command timeouts.
pub struct Topology {
    primary: Node,
    replicas: Vec<Node>,
    read_from: ReadFrom,
    command_timeout: Option<Duration>,
    cursor: AtomicUsize,
}

impl Topology {
    pub fn new(
        primary: Node,
        replicas: Vec<Node>,
        read_from: ReadFrom,
        command_timeout: Option<Duration>,
    ) -> Self {
        Self {
            primary,
            replicas,
            read_from,
            command_timeout,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Creates every node described by the factory.
    ///
    /// With eager initialization the connections are opened here and any
    /// unreachable node fails startup.
    pub async fn open(factory: &ConnectionFactory) -> Result<Self> {
        let options = &factory.client.client_options;
        let connect_timeout = options.socket.connect_timeout;
        info!(
            "Client options: timeout={:?}, connect_timeout={:?}, tcp_no_delay={}, keep_alive={}",
            options.timeout,
            connect_timeout,
            options.socket.tcp_no_delay,
            options.socket.keep_alive.enabled
        );

        let build = |address: &NodeAddress| -> Result<Node> {
            let info = factory.connection_info(address);
            match factory.pool_config() {
                Some(pool) => Node::pooled(address.clone(), info, &pool, connect_timeout),
                None => Node::shared(address.clone(), info, connect_timeout),
            }
        };

        let primary = build(&factory.topology.primary)?;
        let replicas = factory
            .topology
            .replicas
            .iter()
            .map(build)
            .collect::<Result<Vec<_>>>()?;

        let topology = Self::new(
            primary,
            replicas,
            factory.client.read_from,
            options.timeout.command_timeout(),
        );

        if factory.eager_initialization {
            let idle = factory.pool_config().map(|pool| pool.min_idle).unwrap_or(1);
            for node in topology.nodes() {
                node.warm(idle).await?;
            }
            info!("Eagerly connected to {} nodes", topology.node_count());
        }

        Ok(topology)
    }

    /// Connection to the primary.
    pub async fn write_connection(&self) -> Result<NodeConnection> {
        self.acquire(&self.primary).await
    }

    /// Connection to the first reachable node allowed by the read policy.
    pub async fn read_connection(&self) -> Result<NodeConnection> {
        let offset = self.cursor.fetch_add(1, Ordering::Relaxed);
        let mut last_error = None;

        for candidate in self.read_from.candidates(self.replicas.len(), offset) {
            let node = match candidate {
                NodeRef::Primary => &self.primary,
                NodeRef::Replica(index) => &self.replicas[index],
            };
            match self.acquire(node).await {
                Ok(connection) => return Ok(connection),
                Err(err) if err.is_backend() => {
                    warn!("Read node {} unavailable: {}", node.address(), err);
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_error.unwrap_or_else(|| CacheError::NoReadNode(self.read_from.to_string())))
    }

    /// Checks out a connection from `node` within the command timeout.
    async fn acquire(&self, node: &Node) -> Result<NodeConnection> {
        match self.command_timeout {
            Some(limit) => match tokio::time::timeout(limit, node.connection()).await {
                Ok(result) => result,
                Err(_) => {
                    node.mark_down();
                    Err(CacheError::Timeout(limit))
                }
            },
            None => node.connection().await,
        }
    }

    /// Awaits a command under the configured command timeout.
    pub async fn execute<T, F>(&self, command: F) -> Result<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match self.command_timeout {
            Some(limit) => match tokio::time::timeout(limit, command).await {
                Ok(result) => Ok(result?),
                Err(_) => Err(CacheError::Timeout(limit)),
            },
            None => Ok(command.await?),
        }
    }

    pub fn read_from(&self) -> ReadFrom {
        self.read_from
    }

    pub fn node_count(&self) -> usize {
        1 + self.replicas.len()
    }

    /// Pools of every pooled node, for the idle eviction task.
    pub fn pools(&self) -> Vec<Pool> {
        self.nodes().filter_map(Node::pool).cloned().collect()
    }

    /// Closes every pool. Shared connections close when dropped.
    pub fn close(&self) {
        for pool in self.pools() {
            pool.close();
        }
        info!("Closed connections to {} nodes", self.node_count());
    }

    fn nodes(&self) -> impl Iterator<Item = &Node> {
        std::iter::once(&self.primary).chain(self.replicas.iter())
    }
}

/// Errors that mean the node could not be reached, as opposed to a busy pool.
fn is_connect_failure(err: &CacheError) -> bool {
    matches!(
        err,
        CacheError::Redis(_)
            | CacheError::Timeout(_)
            | CacheError::Pool(PoolError::Backend(_))
            | CacheError::Pool(PoolError::Timeout(TimeoutType::Create))
    )
}
