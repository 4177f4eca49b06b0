//! Redis Client Module
//!
//! Builds the client configuration from [`crate::config::Config`] and opens
//! the master-replica topology.
//!
//! # Pipeline
//! 1. Pool choice (pooled vs shared connections)
//! 2. TLS and peer verification
//! 3. Read-from policy
//! 4. Client options (timeouts, socket)
//! 5. Primary and replica nodes

mod factory;
mod options;
mod read_from;
mod topology;

pub use factory::{
    ClientConfiguration, ClientConfigurationBuilder, ConnectionFactory, ConnectionMode,
    PoolConfig, TopologyConfiguration,
};
pub use options::{ClientOptions, KeepAliveOptions, SocketOptions, TimeoutPolicy};
pub use read_from::{NodeRef, ReadFrom};
pub use topology::{Node, NodeConnection, Topology, NODE_DOWN_BACKOFF};
