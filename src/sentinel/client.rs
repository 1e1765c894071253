/// Sentinel client built on the `redis` crate
///
/// Queries the configured sentinels in order. The first sentinel that gives a
/// usable answer is promoted to the front of the list so later rounds ask it
/// first.
use super::{MonitorClient, MonitorFactory, NodeState};
use crate::core::locator::node_connection_info;
use crate::core::Endpoint;
use crate::error::{SentinelError, SentinelResult};
use crate::store::classify_redis_error;
use redis::{Client, Cmd, FromRedisValue};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Builds [`RedisSentinelClient`]s
#[derive(Debug, Clone, Default)]
pub struct RedisSentinelFactory {
    min_other_sentinels: usize,
}

impl RedisSentinelFactory {
    pub fn new(min_other_sentinels: usize) -> Self {
        Self {
            min_other_sentinels,
        }
    }
}

impl MonitorFactory for RedisSentinelFactory {
    type Client = RedisSentinelClient;

    fn build(
        &self,
        endpoints: &[Endpoint],
        timeout: Duration,
        password: Option<&str>,
    ) -> RedisSentinelClient {
        RedisSentinelClient {
            sentinels: Mutex::new(endpoints.to_vec()),
            timeout,
            password: password.map(str::to_string),
            min_other_sentinels: self.min_other_sentinels,
        }
    }
}

pub struct RedisSentinelClient {
    sentinels: Mutex<Vec<Endpoint>>,
    timeout: Duration,
    password: Option<String>,
    min_other_sentinels: usize,
}

impl RedisSentinelClient {
    /// Current sentinel order
    pub fn sentinels(&self) -> Vec<Endpoint> {
        self.sentinels.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn promote(&self, sentinel: &Endpoint) {
        let mut sentinels = self.sentinels.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pos) = sentinels.iter().position(|s| s == sentinel) {
            sentinels.swap(0, pos);
        }
    }

    async fn query<T: FromRedisValue>(&self, sentinel: &Endpoint, cmd: &Cmd) -> SentinelResult<T> {
        let info = node_connection_info(sentinel, self.password.as_deref(), 0);
        let client = Client::open(info).map_err(|e| classify_redis_error(&e))?;

        let mut conn = match timeout(self.timeout, client.get_multiplexed_async_connection()).await {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => return Err(classify_redis_error(&e)),
            Err(_) => return Err(SentinelError::timeout(format!("connect to sentinel {}", sentinel))),
        };

        match timeout(self.timeout, cmd.query_async::<T>(&mut conn)).await {
            Ok(result) => result.map_err(|e| classify_redis_error(&e)),
            Err(_) => Err(SentinelError::timeout(format!("query sentinel {}", sentinel))),
        }
    }
}

#[async_trait::async_trait]
impl MonitorClient for RedisSentinelClient {
    async fn discover_primary(&self, cluster_name: &str) -> SentinelResult<Endpoint> {
        let mut cmd = redis::cmd("SENTINEL");
        cmd.arg("MASTER").arg(cluster_name);

        let mut failures = Vec::new();
        for sentinel in self.sentinels() {
            let state = match self.query::<HashMap<String, String>>(&sentinel, &cmd).await {
                Ok(fields) => NodeState::from_fields(&fields),
                Err(e) => {
                    warn!("Sentinel {} failed to report primary: {}", sentinel, e);
                    failures.push(format!("{}: {}", sentinel, e));
                    continue;
                }
            };

            match state.endpoint.clone() {
                Some(primary) if state.is_usable_primary(self.min_other_sentinels) => {
                    debug!("Sentinel {} reports primary {} for '{}'", sentinel, primary, cluster_name);
                    self.promote(&sentinel);
                    return Ok(primary);
                }
                _ => failures.push(format!("{}: unusable state {:?}", sentinel, state.flags)),
            }
        }

        Err(SentinelError::discovery(format!(
            "No master found for '{}' ({})",
            cluster_name,
            failures.join("; ")
        )))
    }

    async fn discover_replicas(&self, cluster_name: &str) -> SentinelResult<Vec<Endpoint>> {
        let mut cmd = redis::cmd("SENTINEL");
        cmd.arg("SLAVES").arg(cluster_name);

        for sentinel in self.sentinels() {
            let reported = match self.query::<Vec<HashMap<String, String>>>(&sentinel, &cmd).await {
                Ok(reported) => reported,
                Err(e) => {
                    warn!("Sentinel {} failed to report replicas: {}", sentinel, e);
                    continue;
                }
            };

            let replicas: Vec<Endpoint> = reported
                .iter()
                .map(NodeState::from_fields)
                .filter(NodeState::is_usable_replica)
                .filter_map(|state| state.endpoint)
                .collect();

            if !replicas.is_empty() {
                debug!("Sentinel {} reports {} replicas for '{}'", sentinel, replicas.len(), cluster_name);
                return Ok(replicas);
            }
        }

        Ok(Vec::new())
    }
}
