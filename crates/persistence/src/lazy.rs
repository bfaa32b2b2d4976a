//! Lazily initialized cluster client.
//!
//! [`LazyClient`] owns the storage configuration and defers every network
//! call until the first [`get`](LazyClient::get). That first call connects,
//! detects the engine version, installs the matching index template and caches
//! the client for the rest of the process.
//!
//! # States
//!
//! ```text
//! Uninitialized --get--> Initializing --ok--> Ready --close--> Closed
//!       ^                     |
//!       |                   error
//!       +------get------- Failed
//! ```
//!
//! Exactly one initialization runs at a time. Callers that arrive while it is
//! running wait for it and share its outcome, success or error. A failure is
//! not cached: the next caller to arrive afterwards starts a fresh attempt.
//! There is no automatic retry or backoff; retry cadence belongs to the caller.
//!
//! A `get` future dropped mid-initialization (e.g. by a caller's timeout)
//! leaves the holder in its previous state. A client it had already connected
//! is closed on the runtime in the background.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex as StateLock, RwLock};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::client::{ClusterClient, ClusterConnector, ClusterHealth};
use crate::config::StorageConfig;
use crate::error::{BackendError, StorageError, StorageResult};
use crate::template::generate_template;

/// Observable lifecycle state of a [`LazyClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// No connection has been attempted.
    Uninitialized,
    /// An initialization attempt is in flight.
    Initializing,
    /// Connected with the template installed.
    Ready,
    /// The last attempt failed; the next `get` retries.
    Failed,
    /// Closed; `get` fails from now on.
    Closed,
}

enum Slot<C> {
    Uninitialized,
    Failed { attempt: u64, error: StorageError },
    Ready(Arc<C>),
    Closed,
}

/// A cluster client created on first use.
///
/// Cheap to construct: nothing touches the network until [`get`](Self::get).
pub struct LazyClient<K: ClusterConnector> {
    config: StorageConfig,
    connector: K,
    /// Fast path once Ready; never held across an await.
    cached: RwLock<Option<Arc<K::Client>>>,
    /// Held for the whole initialization so concurrent callers queue behind it.
    slot: Mutex<Slot<K::Client>>,
    /// Number of initialization attempts that have finished.
    completed_attempts: AtomicU64,
    /// Lifecycle state as reported by [`state`](Self::state).
    phase: StateLock<ClientState>,
}

/// Marks an initialization as in flight, restoring the prior state if the
/// attempt is dropped before it records an outcome.
struct InitializingGuard<'a> {
    phase: &'a StateLock<ClientState>,
    previous: ClientState,
}

impl<'a> InitializingGuard<'a> {
    fn enter(phase: &'a StateLock<ClientState>) -> Self {
        let previous = std::mem::replace(&mut *phase.lock(), ClientState::Initializing);
        Self { phase, previous }
    }
}

impl Drop for InitializingGuard<'_> {
    fn drop(&mut self) {
        let mut phase = self.phase.lock();
        if *phase == ClientState::Initializing {
            *phase = self.previous;
        }
    }
}

/// Closes a freshly connected client unless setup completes and disarms it.
struct CloseOnDrop<C: ClusterClient + 'static> {
    client: Arc<C>,
    armed: bool,
}

impl<C: ClusterClient + 'static> CloseOnDrop<C> {
    fn new(client: C) -> Self {
        Self {
            client: Arc::new(client),
            armed: true,
        }
    }

    fn disarm(mut self) -> Arc<C> {
        self.armed = false;
        Arc::clone(&self.client)
    }
}

impl<C: ClusterClient + 'static> Drop for CloseOnDrop<C> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let client = Arc::clone(&self.client);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!("Initialization abandoned; closing connected client");
                handle.spawn(async move { client.close().await });
            }
            Err(_) => {
                tracing::warn!(
                    "Initialization abandoned outside a runtime; client dropped unclosed"
                );
            }
        }
    }
}

impl<K: ClusterConnector> LazyClient<K> {
    /// Creates a client holder. Fails only if `config` is invalid.
    pub fn new(config: StorageConfig, connector: K) -> StorageResult<Self> {
        config.validate()?;

        Ok(Self {
            config,
            connector,
            cached: RwLock::new(None),
            slot: Mutex::new(Slot::Uninitialized),
            completed_attempts: AtomicU64::new(0),
            phase: StateLock::new(ClientState::Uninitialized),
        })
    }

    /// Returns the configuration this holder was built with.
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Returns the ready client, initializing it first if needed.
    ///
    /// Callers that arrive while another caller's initialization is running
    /// receive that attempt's outcome instead of starting their own.
    pub async fn get(&self) -> StorageResult<Arc<K::Client>> {
        let cached = self.cached.read().clone();
        if let Some(client) = cached {
            return Ok(client);
        }

        let arrived_after = self.completed_attempts.load(Ordering::Acquire);
        let mut slot = self.slot.lock().await;

        match &*slot {
            Slot::Ready(client) => return Ok(Arc::clone(client)),
            Slot::Closed => return Err(BackendError::Closed.into()),
            Slot::Failed { attempt, error } if *attempt > arrived_after => {
                return Err(error.clone());
            }
            Slot::Uninitialized | Slot::Failed { .. } => {}
        }

        let attempt = self.completed_attempts.load(Ordering::Acquire) + 1;
        let _initializing = InitializingGuard::enter(&self.phase);
        let outcome = self.initialize().await;
        self.completed_attempts.store(attempt, Ordering::Release);

        match outcome {
            Ok(client) => {
                *self.cached.write() = Some(Arc::clone(&client));
                *slot = Slot::Ready(Arc::clone(&client));
                *self.phase.lock() = ClientState::Ready;
                Ok(client)
            }
            Err(error) => {
                tracing::warn!(
                    cluster = %self.config.cluster_name,
                    attempt,
                    retryable = error.is_retryable(),
                    "Search cluster initialization failed: {}",
                    error
                );
                *slot = Slot::Failed {
                    attempt,
                    error: error.clone(),
                };
                *self.phase.lock() = ClientState::Failed;
                Err(error)
            }
        }
    }

    /// Connects and checks that the cluster is not red.
    pub async fn check(&self) -> StorageResult<ClusterHealth> {
        let client = self.get().await?;
        let health = client.health().await?;

        if health == ClusterHealth::Red {
            return Err(BackendError::Unavailable {
                message: format!("cluster {} status is red", self.config.cluster_name),
            }
            .into());
        }

        Ok(health)
    }

    /// Snapshot of the current lifecycle state.
    pub fn state(&self) -> ClientState {
        *self.phase.lock()
    }

    /// Closes the client, waiting for any in-flight initialization first.
    ///
    /// A ready client is closed exactly once. Closing a holder that never
    /// connected, or closing twice, does nothing beyond marking it closed.
    pub async fn close(&self) {
        let mut slot = self.slot.lock().await;
        let previous = std::mem::replace(&mut *slot, Slot::Closed);
        self.cached.write().take();
        *self.phase.lock() = ClientState::Closed;

        match previous {
            Slot::Ready(client) => {
                client.close().await;
                tracing::info!(cluster = %self.config.cluster_name, "Closed search cluster client");
            }
            Slot::Uninitialized | Slot::Failed { .. } => {
                tracing::debug!(cluster = %self.config.cluster_name, "Closed before connecting");
            }
            Slot::Closed => {}
        }
    }

    async fn initialize(&self) -> StorageResult<Arc<K::Client>> {
        tracing::debug!(
            cluster = %self.config.cluster_name,
            hosts = ?self.config.hosts,
            "Connecting to search cluster"
        );

        let connected = CloseOnDrop::new(self.connector.connect(&self.config.hosts).await?);

        match self.install_template(&connected.client).await {
            Ok(()) => Ok(connected.disarm()),
            Err(error) => {
                let client = connected.disarm();
                client.close().await;
                Err(error)
            }
        }
    }

    async fn install_template(&self, client: &K::Client) -> StorageResult<()> {
        let version = client.version().await?;
        let template = generate_template(&version, &self.config)?;

        if template.requires_fielddata() {
            tracing::warn!(
                index = %self.config.index,
                engine_version = %version,
                "Tokenized trace ids enable fielddata, which is memory-expensive"
            );
        }

        let name = self.config.template_name();
        client.put_template(&name, &template).await?;

        tracing::info!(
            template = %name,
            pattern = %self.config.index_pattern(),
            engine_version = %version,
            dialect = ?template.dialect(),
            "Installed index template"
        );

        Ok(())
    }
}

#[cfg(feature = "elasticsearch")]
impl LazyClient<crate::backends::elasticsearch::ElasticsearchConnector> {
    /// Creates a holder that connects over HTTP.
    pub fn elasticsearch(config: StorageConfig) -> StorageResult<Self> {
        let connector = crate::backends::elasticsearch::ElasticsearchConnector::new(&config);
        Self::new(config, connector)
    }
}

/// Renders `{"clusterName": "<name>", "hosts": ["<h1>", ...]}` from configuration only.
impl<K: ClusterConnector> fmt::Display for LazyClient<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{\"clusterName\": {}, \"hosts\": [",
            Value::from(self.config.cluster_name.as_str())
        )?;
        for (i, host) in self.config.hosts.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", Value::from(host.as_str()))?;
        }
        f.write_str("]}")
    }
}

impl<K: ClusterConnector> fmt::Debug for LazyClient<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyClient")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
