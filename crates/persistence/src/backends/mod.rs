//! Cluster transport implementations.
//!
//! Each transport implements [`ClusterConnector`](crate::ClusterConnector) and
//! is gated behind a feature flag.
//!
//! | Backend | Feature | Description |
//! |---------|---------|-------------|
//! | Elasticsearch | `elasticsearch` (default) | HTTP transport via the official client |

#[cfg(feature = "elasticsearch")]
pub mod elasticsearch;
