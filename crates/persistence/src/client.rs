//! Cluster collaborator traits.
//!
//! [`LazyClient`](crate::LazyClient) never talks to the network itself. It
//! asks a [`ClusterConnector`] for a [`ClusterClient`] and drives the
//! initialization sequence through it, so tests can substitute an in-memory
//! cluster for the HTTP transport in
//! [`backends::elasticsearch`](crate::backends).

use std::fmt;

use async_trait::async_trait;

use crate::error::BackendError;
use crate::template::IndexTemplate;

/// Cluster health as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterHealth {
    /// All shards allocated.
    Green,
    /// All primaries allocated, some replicas not.
    Yellow,
    /// At least one primary shard unallocated.
    Red,
}

impl ClusterHealth {
    /// Parses the engine's `status` field.
    pub fn parse(status: &str) -> Option<Self> {
        match status {
            "green" => Some(ClusterHealth::Green),
            "yellow" => Some(ClusterHealth::Yellow),
            "red" => Some(ClusterHealth::Red),
            _ => None,
        }
    }
}

impl fmt::Display for ClusterHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterHealth::Green => write!(f, "green"),
            ClusterHealth::Yellow => write!(f, "yellow"),
            ClusterHealth::Red => write!(f, "red"),
        }
    }
}

/// Opens clients against a cluster.
#[async_trait]
pub trait ClusterConnector: Send + Sync {
    /// The client type produced by this connector.
    type Client: ClusterClient + 'static;

    /// Connects to the first reachable host.
    ///
    /// Fails with [`BackendError::Connectivity`] when no host answers.
    async fn connect(&self, hosts: &[String]) -> Result<Self::Client, BackendError>;
}

/// A connected cluster client.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Returns the engine version string, e.g. `"5.0.0"`.
    async fn version(&self) -> Result<String, BackendError>;

    /// Installs or replaces the index template `name`.
    ///
    /// Installing an identical template again must leave the cluster unchanged.
    async fn put_template(&self, name: &str, template: &IndexTemplate)
    -> Result<(), BackendError>;

    /// Returns the current cluster health.
    async fn health(&self) -> Result<ClusterHealth, BackendError>;

    /// Releases network resources held by the client.
    async fn close(&self);
}
