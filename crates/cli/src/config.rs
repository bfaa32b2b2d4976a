//! Command line and environment configuration.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `ES_CLUSTER` | elasticsearch | Cluster name, for diagnostics |
//! | `ES_HOSTS` | localhost | Comma-separated hosts (`host`, `host:port` or URL) |
//! | `ES_INDEX` | zipkin | Index family name |
//! | `ES_INDEX_SHARDS` | 5 | Primary shards per index |
//! | `ES_INDEX_REPLICAS` | 1 | Replica shards per index |
//! | `ES_STRICT_TRACE_ID` | true | Exact-match trace ids |
//! | `ES_TIMEOUT_MS` | 30000 | HTTP request timeout (milliseconds) |
//! | `SPANSTORE_LOG_LEVEL` | info | Log level |

use clap::{ArgAction, Args, Parser, Subcommand};
use spanstore_persistence::StorageConfig;

/// Span storage administration.
#[derive(Debug, Clone, Parser)]
#[command(name = "spanstore")]
#[command(about = "Manage the span storage index template")]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "SPANSTORE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(flatten)]
    pub storage: StorageArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the index template for an engine version without contacting the cluster.
    Template {
        /// Engine version to generate for, e.g. 2.4.0 or 5.0.0.
        #[arg(long)]
        engine_version: String,
    },

    /// Connect, install the index template and report cluster health.
    Install,
}

/// Storage settings shared by all subcommands.
#[derive(Debug, Clone, Args)]
pub struct StorageArgs {
    /// Cluster name.
    #[arg(long, env = "ES_CLUSTER", default_value = "elasticsearch")]
    pub cluster: String,

    /// Cluster hosts (comma-separated).
    #[arg(long, env = "ES_HOSTS", value_delimiter = ',', default_value = "localhost")]
    pub hosts: Vec<String>,

    /// Index family name.
    #[arg(long, env = "ES_INDEX", default_value = "zipkin")]
    pub index: String,

    /// Primary shards per index.
    #[arg(long, env = "ES_INDEX_SHARDS", default_value = "5")]
    pub index_shards: u32,

    /// Replica shards per index.
    #[arg(long, env = "ES_INDEX_REPLICAS", default_value = "1")]
    pub index_replicas: u32,

    /// Index trace ids for exact match only.
    #[arg(long, env = "ES_STRICT_TRACE_ID", default_value = "true", action = ArgAction::Set)]
    pub strict_trace_id: bool,

    /// HTTP request timeout in milliseconds.
    #[arg(long, env = "ES_TIMEOUT_MS", default_value = "30000")]
    pub timeout_ms: u64,
}

impl StorageArgs {
    /// Builds the storage configuration.
    pub fn to_config(&self) -> StorageConfig {
        StorageConfig {
            cluster_name: self.cluster.clone(),
            hosts: self
                .hosts
                .iter()
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
                .collect(),
            index: self.index.clone(),
            index_shards: self.index_shards,
            index_replicas: self.index_replicas,
            strict_trace_id: self.strict_trace_id,
            request_timeout_ms: self.timeout_ms,
        }
    }
}
