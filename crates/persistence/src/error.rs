//! Error types for the persistence layer.
//!
//! Errors are split by the layer that raises them: configuration, template
//! generation and the cluster backend. [`StorageError`] joins them so callers of
//! [`LazyClient::get`](crate::LazyClient::get) see a single type.
//!
//! Every variant carries owned data only, which keeps the whole hierarchy
//! `Clone`. A failed initialization attempt is handed to every caller that was
//! waiting on it.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all storage operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Index template generation errors
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Cluster backend errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors raised while validating a [`StorageConfig`](crate::StorageConfig).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A configuration field holds a value that cannot be used.
    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// Errors raised by the index template generator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// The engine reported a version string with no parseable major number.
    #[error("invalid engine version '{version}': {message}")]
    InvalidVersion { version: String, message: String },

    /// The engine is older than the oldest known mapping dialect.
    #[error("unsupported engine version '{version}': major version {major} has no mapping dialect")]
    UnsupportedVersion { version: String, major: u32 },
}

/// Errors originating from the search cluster.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// No configured host could be reached.
    #[error("no node available in cluster {cluster_name}: {message}")]
    Connectivity {
        cluster_name: String,
        message: String,
    },

    /// The cluster answered, but its version could not be read.
    #[error("version detection failed: {message}")]
    VersionDetection { message: String },

    /// The cluster rejected the index template.
    #[error("index template '{template_name}' was rejected: {message}")]
    TemplateSubmission {
        template_name: String,
        message: String,
    },

    /// The cluster is reachable but not able to serve requests.
    #[error("cluster unavailable: {message}")]
    Unavailable { message: String },

    /// The client was closed and can no longer be used.
    #[error("client is closed")]
    Closed,
}

impl StorageError {
    /// Returns `true` when a later attempt may succeed without any change to
    /// configuration or cluster schema, e.g. after a node restart.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StorageError::Backend(
                BackendError::Connectivity { .. }
                    | BackendError::VersionDetection { .. }
                    | BackendError::Unavailable { .. }
            )
        )
    }
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for template generation.
pub type TemplateResult<T> = Result<T, TemplateError>;
