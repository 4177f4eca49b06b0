//! Read-from policy for master-replica topologies.

use std::fmt;
use std::str::FromStr;

/// Which node class serves a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadFrom {
    /// Primary only
    Master,
    /// Primary, falling back to replicas
    MasterPreferred,
    /// Replicas only, in declared order
    Replica,
    /// Replicas, falling back to the primary
    #[default]
    ReplicaPreferred,
    /// Any node, rotating across primary and replicas
    Any,
    /// Replicas only, rotating
    AnyReplica,
}

/// Reference to a node in a topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef {
    Primary,
    Replica(usize),
}

impl ReadFrom {
    /// Orders the nodes a read should try, first choice first.
    ///
    /// `offset` rotates replica choice between calls so load spreads across
    /// replicas. An empty result means the policy has nothing to read from.
    pub fn candidates(&self, replicas: usize, offset: usize) -> Vec<NodeRef> {
        let rotated = |offset: usize| -> Vec<NodeRef> {
            (0..replicas)
                .map(|i| NodeRef::Replica((i + offset % replicas) % replicas))
                .collect()
        };

        match self {
            ReadFrom::Master => vec![NodeRef::Primary],
            ReadFrom::MasterPreferred => {
                let mut nodes = vec![NodeRef::Primary];
                nodes.extend(rotated(offset));
                nodes
            }
            ReadFrom::Replica => rotated(0),
            ReadFrom::ReplicaPreferred => {
                let mut nodes = rotated(offset);
                nodes.push(NodeRef::Primary);
                nodes
            }
            ReadFrom::Any => {
                let mut nodes = vec![NodeRef::Primary];
                nodes.extend(rotated(0));
                let len = nodes.len();
                nodes.rotate_left(offset % len);
                nodes
            }
            ReadFrom::AnyReplica => rotated(offset),
        }
    }
}

impl FromStr for ReadFrom {
    type Err = String;

    /// Accepts camelCase, SCREAMING_SNAKE and kebab spellings, plus the
    /// legacy `upstream`/`slave` aliases.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized: String = value
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "master" | "upstream" => Ok(Self::Master),
            "masterpreferred" | "upstreampreferred" => Ok(Self::MasterPreferred),
            "replica" | "slave" => Ok(Self::Replica),
            "replicapreferred" | "slavepreferred" => Ok(Self::ReplicaPreferred),
            "any" => Ok(Self::Any),
            "anyreplica" => Ok(Self::AnyReplica),
            _ => Err(format!("unknown read-from policy: {value}")),
        }
    }
}

impl fmt::Display for ReadFrom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReadFrom::Master => "master",
            ReadFrom::MasterPreferred => "masterPreferred",
            ReadFrom::Replica => "replica",
            ReadFrom::ReplicaPreferred => "replicaPreferred",
            ReadFrom::Any => "any",
            ReadFrom::AnyReplica => "anyReplica",
        };
        f.write_str(name)
    }
}
