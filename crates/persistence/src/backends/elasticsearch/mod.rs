//! Elasticsearch HTTP transport.
//!
//! Provides the production [`ClusterConnector`](crate::ClusterConnector) used by
//! [`LazyClient`](crate::LazyClient).
//!
//! # Example
//!
//! ```no_run
//! use spanstore_persistence::backends::elasticsearch::ElasticsearchConnector;
//! use spanstore_persistence::{LazyClient, StorageConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StorageConfig {
//!     hosts: vec!["es1:9200".to_string(), "es2:9200".to_string()],
//!     ..Default::default()
//! };
//! let connector = ElasticsearchConnector::new(&config);
//! let client = LazyClient::new(config, connector)?;
//!
//! // Connects, detects the version and installs the template on first use
//! let es = client.get().await?;
//! println!("connected to {}", es.node());
//! client.close().await;
//! # Ok(())
//! # }
//! ```

mod transport;

pub use transport::{ElasticsearchClient, ElasticsearchConnector};
