//! Spanstore Persistence Layer
//!
//! Connection and schema management for span storage on an Elasticsearch
//! cluster. Before any span is written or queried, the cluster must carry an
//! index template matching its engine version; this crate generates that
//! template and installs it exactly once, on first use.
//!
//! # Architecture
//!
//! - [`config`] - Storage configuration and host normalization
//! - [`error`] - Error types for all operations
//! - [`template`] - Version-aware index template generator (pure, no I/O)
//! - [`client`] - Traits for the cluster transport
//! - [`lazy`] - [`LazyClient`], the once-only initializer
//! - [`backends`] - Transport implementations (Elasticsearch over HTTP)
//!
//! # Backend Features
//!
//! - `elasticsearch` (default) - HTTP transport via the `elasticsearch` crate
//!
//! # Template Generation
//!
//! The template is a pure function of the engine version and configuration:
//!
//! ```
//! use spanstore_persistence::{StorageConfig, generate_template};
//!
//! let config = StorageConfig {
//!     strict_trace_id: false,
//!     ..Default::default()
//! };
//!
//! let template = generate_template("2.4.0", &config).unwrap();
//! assert_eq!(
//!     template.trace_id_mapping().to_string(),
//!     r#"{"type":"string","analyzer":"traceId_analyzer"}"#
//! );
//! assert!(generate_template("not-a-version", &config).is_err());
//! ```
//!
//! # Lazy Initialization
//!
//! ```no_run
//! use spanstore_persistence::{LazyClient, StorageConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = LazyClient::elasticsearch(StorageConfig {
//!     cluster_name: "traces".to_string(),
//!     hosts: vec!["es1".to_string(), "es2".to_string()],
//!     ..Default::default()
//! })?;
//!
//! // Rendered from configuration alone; nothing has connected yet
//! assert_eq!(
//!     client.to_string(),
//!     r#"{"clusterName": "traces", "hosts": ["es1", "es2"]}"#
//! );
//!
//! let es = client.get().await?;
//! # let _ = es;
//! client.close().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod backends;
pub mod client;
pub mod config;
pub mod error;
pub mod lazy;
pub mod template;

pub use client::{ClusterClient, ClusterConnector, ClusterHealth};
pub use config::StorageConfig;
pub use error::{
    BackendError, ConfigError, StorageError, StorageResult, TemplateError, TemplateResult,
};
pub use lazy::{ClientState, LazyClient};
pub use template::{EngineVersion, IndexTemplate, MappingDialect, generate_template};
