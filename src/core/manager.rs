/// Sentinel-aware connection manager
///
/// Owns at most one write connection (to the primary) and one read connection
/// (to a replica, or the primary when no replica is available). Each slot is
/// filled lazily on first use by asking the sentinels for the current
/// topology, and stays cached until [`SentinelConnectionManager::reset`]
/// clears both slots. Discovery results are never cached apart from the
/// connection built from them.
use crate::config::SentinelOptions;
use crate::core::descriptor::ConnectionDescriptor;
use crate::core::locator::ConnectionLocator;
use crate::core::selection::{selector_for, ReplicaSelector};
use crate::core::Endpoint;
use crate::error::SentinelResult;
use crate::sentinel::{MonitorClient, MonitorFactory};
use crate::store::{ConnectionFactory, PooledConnection};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

pub struct SentinelConnectionManager<M: MonitorFactory, F: ConnectionFactory> {
    connection_string: String,
    descriptor: ConnectionDescriptor,
    options: SentinelOptions,
    monitors: M,
    factory: F,
    selector: Box<dyn ReplicaSelector>,
    // Each slot lock is held across discovery and connect so concurrent
    // first users share one discovery round.
    write_slot: Mutex<Option<Arc<F::Connection>>>,
    read_slot: Mutex<Option<Arc<F::Connection>>>,
}

impl<M: MonitorFactory, F: ConnectionFactory> SentinelConnectionManager<M, F> {
    /// Create a manager for `connection_string`. A malformed descriptor or
    /// invalid options fail here, before any network activity.
    pub fn new(
        connection_string: impl Into<String>,
        options: SentinelOptions,
        monitors: M,
        factory: F,
    ) -> SentinelResult<Self> {
        let connection_string = connection_string.into();
        let descriptor = ConnectionDescriptor::parse(&connection_string)?;
        options.validate()?;

        Ok(Self {
            connection_string,
            descriptor,
            selector: selector_for(options.read_strategy),
            options,
            monitors,
            factory,
            write_slot: Mutex::new(None),
            read_slot: Mutex::new(None),
        })
    }

    /// Replace the replica selection policy
    pub fn with_selector(mut self, selector: Box<dyn ReplicaSelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    pub fn descriptor(&self) -> &ConnectionDescriptor {
        &self.descriptor
    }

    pub fn options(&self) -> &SentinelOptions {
        &self.options
    }

    pub fn monitors(&self) -> &M {
        &self.monitors
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Cached connection for `write`, or a freshly discovered one.
    /// On failure the slot stays empty and the error is returned as is.
    pub async fn get_connection(&self, write: bool) -> SentinelResult<Arc<F::Connection>> {
        debug!("get_connection called: write={}", write);

        let mut slot = self.slot(write).lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(Arc::clone(conn));
        }

        let conn = Arc::new(self.connect(write).await?);
        *slot = Some(Arc::clone(&conn));
        Ok(conn)
    }

    /// Whether a connection for `write` is currently cached
    pub async fn has_connection(&self, write: bool) -> bool {
        self.slot(write).lock().await.is_some()
    }

    /// Drop both cached connections. With `close_connection` set, idle pooled
    /// sockets are severed first. A reset with nothing cached does nothing.
    pub async fn reset(&self) {
        let mut write_slot = self.write_slot.lock().await;
        let mut read_slot = self.read_slot.lock().await;

        let write = write_slot.take();
        let read = read_slot.take();

        if !self.options.close_connection {
            return;
        }

        debug!("reset called, closing pooled sockets");
        if let Some(conn) = read {
            let closed = conn.disconnect_idle().await;
            debug!("read connection {} closed ({} sockets)", conn.locator(), closed);
        }
        if let Some(conn) = write {
            let closed = conn.disconnect_idle().await;
            debug!("write connection {} closed ({} sockets)", conn.locator(), closed);
        }
    }

    fn slot(&self, write: bool) -> &Mutex<Option<Arc<F::Connection>>> {
        if write {
            &self.write_slot
        } else {
            &self.read_slot
        }
    }

    async fn connect(&self, write: bool) -> SentinelResult<F::Connection> {
        debug!("connect called: write={}", write);

        let monitor = self.monitors.build(
            &self.descriptor.monitor_endpoints,
            self.options.sentinel_timeout(),
            self.options.password.as_deref(),
        );

        let endpoint = if write {
            monitor.discover_primary(&self.descriptor.cluster_name).await?
        } else {
            self.discover_read_endpoint(&monitor).await?
        };

        let locator = ConnectionLocator::new(
            endpoint,
            self.options.password.clone(),
            self.descriptor.db_index.as_str(),
        );
        debug!("Connecting to: {}", locator);
        self.factory.connect(&locator).await
    }

    async fn discover_read_endpoint(&self, monitor: &M::Client) -> SentinelResult<Endpoint> {
        let cluster_name = &self.descriptor.cluster_name;
        let replicas = monitor.discover_replicas(cluster_name).await?;

        match self
            .selector
            .select_replica(&replicas)
            .and_then(|index| replicas.get(index))
        {
            Some(replica) => Ok(replica.clone()),
            None => {
                debug!("no replicas are available, using primary for read");
                monitor.discover_primary(cluster_name).await
            }
        }
    }
}
