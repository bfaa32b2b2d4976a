//! Test infrastructure for the persistence layer.
//!
//! [`MockCluster`] is an in-memory stand-in for a search cluster. It counts
//! every call the lazy client makes so tests can assert how many times each
//! initialization step ran.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use spanstore_persistence::{
    BackendError, ClusterClient, ClusterConnector, ClusterHealth, IndexTemplate, LazyClient,
    StorageConfig,
};

#[derive(Debug, Default)]
pub struct ClusterState {
    pub version: String,
    pub health: Option<ClusterHealth>,
    /// Installed templates by name, as compact JSON.
    pub templates: HashMap<String, String>,
    pub connects: u64,
    pub version_queries: u64,
    pub submissions: u64,
    pub closes: u64,
    pub fail_connects: u64,
    pub reject_templates: bool,
}

#[derive(Debug, Clone)]
pub struct MockCluster {
    state: Arc<Mutex<ClusterState>>,
    connect_delay: Duration,
    version_delay: Duration,
}

impl MockCluster {
    pub fn new(version: &str) -> Self {
        let state = ClusterState {
            version: version.to_string(),
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            connect_delay: Duration::ZERO,
            version_delay: Duration::ZERO,
        }
    }

    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    pub fn with_version_delay(mut self, delay: Duration) -> Self {
        self.version_delay = delay;
        self
    }

    pub fn fail_next_connects(&self, count: u64) {
        self.state().fail_connects = count;
    }

    pub fn reject_templates(&self) {
        self.state().reject_templates = true;
    }

    pub fn set_health(&self, health: ClusterHealth) {
        self.state().health = Some(health);
    }

    pub fn state(&self) -> MutexGuard<'_, ClusterState> {
        self.state.lock().unwrap()
    }

    pub fn template(&self, name: &str) -> Option<String> {
        self.state().templates.get(name).cloned()
    }

    /// Builds a lazy client over this cluster.
    pub fn lazy_client(&self, config: StorageConfig) -> LazyClient<MockCluster> {
        LazyClient::new(config, self.clone()).unwrap()
    }
}

#[async_trait]
impl ClusterConnector for MockCluster {
    type Client = MockClient;

    async fn connect(&self, hosts: &[String]) -> Result<MockClient, BackendError> {
        tokio::time::sleep(self.connect_delay).await;

        let mut state = self.state();
        state.connects += 1;
        if state.fail_connects > 0 {
            state.fail_connects -= 1;
            return Err(BackendError::Connectivity {
                cluster_name: "mock".to_string(),
                message: format!("tried {:?}", hosts),
            });
        }

        Ok(MockClient {
            state: Arc::clone(&self.state),
            version_delay: self.version_delay,
        })
    }
}

#[derive(Debug)]
pub struct MockClient {
    state: Arc<Mutex<ClusterState>>,
    version_delay: Duration,
}

impl MockClient {
    fn state(&self) -> MutexGuard<'_, ClusterState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl ClusterClient for MockClient {
    async fn version(&self) -> Result<String, BackendError> {
        tokio::time::sleep(self.version_delay).await;

        let mut state = self.state();
        state.version_queries += 1;
        Ok(state.version.clone())
    }

    async fn put_template(
        &self,
        name: &str,
        template: &IndexTemplate,
    ) -> Result<(), BackendError> {
        let mut state = self.state();
        state.submissions += 1;
        if state.reject_templates {
            return Err(BackendError::TemplateSubmission {
                template_name: name.to_string(),
                message: "mapper_parsing_exception".to_string(),
            });
        }
        state
            .templates
            .insert(name.to_string(), template.to_json_string());
        Ok(())
    }

    async fn health(&self) -> Result<ClusterHealth, BackendError> {
        Ok(self.state().health.unwrap_or(ClusterHealth::Green))
    }

    async fn close(&self) {
        self.state().closes += 1;
    }
}
