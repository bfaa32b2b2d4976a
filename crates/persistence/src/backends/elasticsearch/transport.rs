//! Connector and client over the `elasticsearch` crate.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use elasticsearch::Elasticsearch;
use elasticsearch::cluster::ClusterHealthParts;
use elasticsearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use elasticsearch::indices::IndicesPutTemplateParts;
use serde_json::Value;
use url::Url;

use crate::client::{ClusterClient, ClusterConnector, ClusterHealth};
use crate::config::{StorageConfig, node_url};
use crate::error::BackendError;
use crate::template::IndexTemplate;

/// Opens HTTP clients against the configured hosts.
#[derive(Debug, Clone)]
pub struct ElasticsearchConnector {
    cluster_name: String,
    request_timeout: Duration,
}

impl ElasticsearchConnector {
    /// Creates a connector using the cluster name and timeout from `config`.
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            cluster_name: config.cluster_name.clone(),
            request_timeout: Duration::from_millis(config.request_timeout_ms),
        }
    }

    /// Builds a client bound to a single node.
    fn build_client(&self, node: &Url) -> Result<Elasticsearch, BackendError> {
        let parsed_url: elasticsearch::http::Url =
            node.as_str().parse().map_err(|e| BackendError::Connectivity {
                cluster_name: self.cluster_name.clone(),
                message: format!("Invalid URL {}: {}", node, e),
            })?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| BackendError::Connectivity {
                cluster_name: self.cluster_name.clone(),
                message: format!("Failed to build transport for {}: {}", node, e),
            })?;

        Ok(Elasticsearch::new(transport))
    }

    /// Pings one host, returning a client bound to it when it answers.
    async fn try_host(&self, host: &str) -> Result<ElasticsearchClient, String> {
        let node = node_url(host).map_err(|e| format!("{}: {}", host, e))?;
        let client = self
            .build_client(&node)
            .map_err(|e| format!("{}: {}", node, e))?;

        let response = client
            .ping()
            .send()
            .await
            .map_err(|e| format!("{}: {}", node, e))?;

        let status = response.status_code();
        if !status.is_success() {
            return Err(format!("{}: ping returned status {}", node, status));
        }

        Ok(ElasticsearchClient {
            client,
            cluster_name: self.cluster_name.clone(),
            node: node.to_string(),
        })
    }
}

#[async_trait]
impl ClusterConnector for ElasticsearchConnector {
    type Client = ElasticsearchClient;

    async fn connect(&self, hosts: &[String]) -> Result<ElasticsearchClient, BackendError> {
        let mut failures = Vec::with_capacity(hosts.len());

        for host in hosts {
            match self.try_host(host).await {
                Ok(client) => {
                    tracing::debug!(
                        cluster = %self.cluster_name,
                        node = %client.node,
                        "Connected to Elasticsearch node"
                    );
                    return Ok(client);
                }
                Err(failure) => {
                    tracing::debug!(
                        cluster = %self.cluster_name,
                        %failure,
                        "Elasticsearch node unreachable"
                    );
                    failures.push(failure);
                }
            }
        }

        Err(BackendError::Connectivity {
            cluster_name: self.cluster_name.clone(),
            message: format!("tried [{}]", failures.join(", ")),
        })
    }
}

/// A client bound to one reachable Elasticsearch node.
pub struct ElasticsearchClient {
    client: Elasticsearch,
    cluster_name: String,
    node: String,
}

impl Debug for ElasticsearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticsearchClient")
            .field("cluster_name", &self.cluster_name)
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}

impl ElasticsearchClient {
    /// Returns the underlying Elasticsearch client.
    pub fn inner(&self) -> &Elasticsearch {
        &self.client
    }

    /// URL of the node this client is bound to.
    pub fn node(&self) -> &str {
        &self.node
    }

    fn unreachable(&self, action: &str, err: impl std::fmt::Display) -> BackendError {
        BackendError::Connectivity {
            cluster_name: self.cluster_name.clone(),
            message: format!("{} failed on {}: {}", action, self.node, err),
        }
    }
}

#[async_trait]
impl ClusterClient for ElasticsearchClient {
    async fn version(&self) -> Result<String, BackendError> {
        let response = self
            .client
            .info()
            .send()
            .await
            .map_err(|e| self.unreachable("Version query", e))?;

        let status = response.status_code();
        if !status.is_success() {
            return Err(BackendError::VersionDetection {
                message: format!("Info endpoint returned status {}", status),
            });
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| BackendError::VersionDetection {
                message: format!("Failed to parse info response: {}", e),
            })?;

        body.pointer("/version/number")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| BackendError::VersionDetection {
                message: format!("Info response has no version.number: {}", body),
            })
    }

    async fn put_template(
        &self,
        name: &str,
        template: &IndexTemplate,
    ) -> Result<(), BackendError> {
        let response = self
            .client
            .indices()
            .put_template(IndicesPutTemplateParts::Name(name))
            .body(template.body().clone())
            .send()
            .await
            .map_err(|e| self.unreachable("Template submission", e))?;

        let status = response.status_code();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::TemplateSubmission {
                template_name: name.to_string(),
                message: format!("status {}: {}", status, body),
            });
        }

        Ok(())
    }

    async fn health(&self) -> Result<ClusterHealth, BackendError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .map_err(|e| self.unreachable("Health check", e))?;

        let status = response.status_code();
        if !status.is_success() {
            return Err(BackendError::Unavailable {
                message: format!("Cluster health returned status {}", status),
            });
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| BackendError::Unavailable {
                message: format!("Failed to parse health response: {}", e),
            })?;

        let cluster_status = body
            .get("status")
            .and_then(|s| s.as_str())
            .unwrap_or("unknown");

        ClusterHealth::parse(cluster_status).ok_or_else(|| BackendError::Unavailable {
            message: format!("Unknown cluster status '{}'", cluster_status),
        })
    }

    async fn close(&self) {
        // The HTTP connection pool is released when the client is dropped
        tracing::debug!(node = %self.node, "Closing Elasticsearch client");
    }
}
