/// Test doubles for the sentinel and store collaborators
use crate::core::locator::ConnectionLocator;
use crate::core::Endpoint;
use crate::error::{SentinelError, SentinelResult};
use crate::sentinel::{MonitorClient, MonitorFactory};
use crate::store::{ConnectionFactory, PooledConnection};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Arguments a monitor client was built with
#[derive(Debug, Clone, PartialEq)]
pub struct BuildArgs {
    pub endpoints: Vec<Endpoint>,
    pub timeout: Duration,
    pub password: Option<String>,
}

/// Scripted cluster topology shared by every client the factory builds
#[derive(Default)]
pub struct MockTopology {
    pub primary: Mutex<Option<Endpoint>>,
    pub replicas: Mutex<Vec<Endpoint>>,
    pub primary_calls: AtomicUsize,
    pub replica_calls: AtomicUsize,
    pub builds: Mutex<Vec<BuildArgs>>,
}

impl MockTopology {
    pub fn new(primary: Option<Endpoint>, replicas: Vec<Endpoint>) -> Arc<Self> {
        Arc::new(Self {
            primary: Mutex::new(primary),
            replicas: Mutex::new(replicas),
            ..Default::default()
        })
    }

    pub fn set_primary(&self, primary: Option<Endpoint>) {
        *self.primary.lock().unwrap() = primary;
    }

    pub fn set_replicas(&self, replicas: Vec<Endpoint>) {
        *self.replicas.lock().unwrap() = replicas;
    }

    pub fn primary_calls(&self) -> usize {
        self.primary_calls.load(Ordering::SeqCst)
    }

    pub fn replica_calls(&self) -> usize {
        self.replica_calls.load(Ordering::SeqCst)
    }

    pub fn discoveries(&self) -> usize {
        self.primary_calls() + self.replica_calls()
    }
}

pub struct MockMonitorFactory {
    pub topology: Arc<MockTopology>,
}

pub struct MockMonitor {
    topology: Arc<MockTopology>,
}

impl MonitorFactory for MockMonitorFactory {
    type Client = MockMonitor;

    fn build(&self, endpoints: &[Endpoint], timeout: Duration, password: Option<&str>) -> MockMonitor {
        self.topology.builds.lock().unwrap().push(BuildArgs {
            endpoints: endpoints.to_vec(),
            timeout,
            password: password.map(str::to_string),
        });
        MockMonitor {
            topology: Arc::clone(&self.topology),
        }
    }
}

#[async_trait::async_trait]
impl MonitorClient for MockMonitor {
    async fn discover_primary(&self, cluster_name: &str) -> SentinelResult<Endpoint> {
        self.topology.primary_calls.fetch_add(1, Ordering::SeqCst);
        self.topology
            .primary
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| SentinelError::discovery(format!("No master found for '{}'", cluster_name)))
    }

    async fn discover_replicas(&self, _cluster_name: &str) -> SentinelResult<Vec<Endpoint>> {
        self.topology.replica_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.topology.replicas.lock().unwrap().clone())
    }
}

/// Hands out [`MockConnection`]s, optionally refusing to connect
#[derive(Default)]
pub struct MockConnectionFactory {
    pub connects: AtomicUsize,
    pub refuse: AtomicBool,
}

impl MockConnectionFactory {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

pub const MOCK_IDLE_SOCKETS: usize = 3;

pub struct MockConnection {
    locator: ConnectionLocator,
    idle: AtomicUsize,
    pub disconnect_calls: AtomicUsize,
}

impl MockConnection {
    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    pub fn idle(&self) -> usize {
        self.idle.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ConnectionFactory for MockConnectionFactory {
    type Connection = MockConnection;

    async fn connect(&self, locator: &ConnectionLocator) -> SentinelResult<MockConnection> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(SentinelError::Transport(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("refused by {}", locator.endpoint),
            )));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(MockConnection {
            locator: locator.clone(),
            idle: AtomicUsize::new(MOCK_IDLE_SOCKETS),
            disconnect_calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait::async_trait]
impl PooledConnection for MockConnection {
    fn locator(&self) -> &ConnectionLocator {
        &self.locator
    }

    async fn disconnect_idle(&self) -> usize {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        self.idle.swap(0, Ordering::SeqCst)
    }
}
