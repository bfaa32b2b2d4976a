//! Storage configuration.
//!
//! [`StorageConfig`] is supplied once by the caller and handed by value to
//! [`LazyClient`](crate::LazyClient), which never exposes it mutably again.
//!
//! # Example
//!
//! ```
//! use spanstore_persistence::StorageConfig;
//!
//! let config = StorageConfig {
//!     cluster_name: "traces".to_string(),
//!     hosts: vec!["es1:9200".to_string(), "es2".to_string()],
//!     index_replicas: 0,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! assert_eq!(config.template_name(), "zipkin_template");
//! ```

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;

/// Port used when a host entry does not name one.
pub const DEFAULT_PORT: u16 = 9200;

/// Configuration for the span storage connection and its index template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Name of the search cluster, used for diagnostics.
    #[serde(default = "default_cluster_name")]
    pub cluster_name: String,

    /// Cluster hosts as `host`, `host:port` or a full URL.
    ///
    /// Order only affects diagnostic output and which host is tried first.
    #[serde(default = "default_hosts")]
    pub hosts: Vec<String>,

    /// Index family name (default: `"zipkin"`).
    /// Daily indices are named `{index}-yyyy-MM-dd` and matched by `{index}-*`.
    #[serde(default = "default_index")]
    pub index: String,

    /// Number of primary shards per index (default: 5).
    #[serde(default = "default_shards")]
    pub index_shards: u32,

    /// Number of replica shards per index (default: 1). Zero suits single-node clusters.
    #[serde(default = "default_replicas")]
    pub index_replicas: u32,

    /// Index trace ids for exact match only (default: true).
    ///
    /// When false, trace ids are tokenized so 64-bit and 128-bit ids of the same
    /// trace can be found with one another.
    #[serde(default = "default_strict_trace_id")]
    pub strict_trace_id: bool,

    /// HTTP request timeout in milliseconds (default: 30000).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_cluster_name() -> String {
    "elasticsearch".to_string()
}

fn default_hosts() -> Vec<String> {
    vec!["localhost".to_string()]
}

fn default_index() -> String {
    "zipkin".to_string()
}

fn default_shards() -> u32 {
    5
}

fn default_replicas() -> u32 {
    1
}

fn default_strict_trace_id() -> bool {
    true
}

fn default_request_timeout_ms() -> u64 {
    30000
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cluster_name: default_cluster_name(),
            hosts: default_hosts(),
            index: default_index(),
            index_shards: default_shards(),
            index_replicas: default_replicas(),
            strict_trace_id: default_strict_trace_id(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl StorageConfig {
    /// Validates configuration invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.index_shards == 0 {
            return Err(invalid("index_shards", "must be > 0"));
        }

        if self.request_timeout_ms == 0 {
            return Err(invalid("request_timeout_ms", "must be > 0"));
        }

        if self.index.trim().is_empty() {
            return Err(invalid("index", "must not be blank"));
        }

        if self.hosts.is_empty() {
            return Err(invalid("hosts", "at least one host is required"));
        }

        for host in &self.hosts {
            node_url(host)?;
        }

        Ok(())
    }

    /// Name under which the index template is installed.
    pub fn template_name(&self) -> String {
        format!("{}_template", self.index)
    }

    /// Index pattern the template applies to.
    pub fn index_pattern(&self) -> String {
        format!("{}-*", self.index)
    }

    /// Returns the normalized node URLs, in configured order.
    pub fn node_urls(&self) -> Result<Vec<Url>, ConfigError> {
        self.hosts.iter().map(|host| node_url(host)).collect()
    }
}

/// Normalizes a host entry into an HTTP URL.
///
/// Bare hosts get the `http` scheme, and `host` or `[v6addr]` without a port
/// gets [`DEFAULT_PORT`]. Entries that already carry a scheme are taken as-is.
pub fn node_url(host: &str) -> Result<Url, ConfigError> {
    let host = host.trim();
    if host.is_empty() {
        return Err(invalid("hosts", "host must not be blank"));
    }

    let candidate = if host.contains("://") {
        host.to_string()
    } else if has_port(host) {
        format!("http://{}", host)
    } else {
        format!("http://{}:{}", host, DEFAULT_PORT)
    };

    Url::parse(&candidate).map_err(|e| invalid("hosts", &format!("'{}': {}", host, e)))
}

fn has_port(authority: &str) -> bool {
    match authority.rsplit_once(':') {
        Some((_, port)) => !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
}
