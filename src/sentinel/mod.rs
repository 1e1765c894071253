/// Sentinel (monitor quorum) discovery
pub mod client;

use crate::core::Endpoint;
use crate::error::SentinelResult;
use std::collections::HashMap;
use std::time::Duration;

/// Answers "who is primary" and "which replicas exist" for a named cluster
#[async_trait::async_trait]
pub trait MonitorClient: Send + Sync {
    /// Current primary; fails when no sentinel knows a usable primary
    async fn discover_primary(&self, cluster_name: &str) -> SentinelResult<Endpoint>;

    /// Healthy replicas; an empty list is not an error
    async fn discover_replicas(&self, cluster_name: &str) -> SentinelResult<Vec<Endpoint>>;
}

/// Builds a [`MonitorClient`] for one discovery round
pub trait MonitorFactory: Send + Sync {
    type Client: MonitorClient;

    fn build(
        &self,
        endpoints: &[Endpoint],
        timeout: Duration,
        password: Option<&str>,
    ) -> Self::Client;
}

/// Node state as reported by `SENTINEL MASTER` / `SENTINEL SLAVES`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeState {
    pub endpoint: Option<Endpoint>,
    pub flags: Vec<String>,
    pub num_other_sentinels: usize,
}

impl NodeState {
    /// Interpret the flat field map a sentinel returns for one node
    pub fn from_fields(fields: &HashMap<String, String>) -> Self {
        let endpoint = match (fields.get("ip"), fields.get("port")) {
            (Some(ip), Some(port)) => port.parse::<u16>().ok().map(|p| Endpoint::new(ip.as_str(), p)),
            _ => None,
        };

        let flags = fields
            .get("flags")
            .map(|f| {
                f.split(',')
                    .filter(|flag| !flag.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let num_other_sentinels = fields
            .get("num-other-sentinels")
            .and_then(|n| n.parse().ok())
            .unwrap_or(0);

        Self {
            endpoint,
            flags,
            num_other_sentinels,
        }
    }

    fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }

    pub fn is_master(&self) -> bool {
        self.has_flag("master")
    }

    /// Subjectively or objectively down
    pub fn is_down(&self) -> bool {
        self.has_flag("s_down") || self.has_flag("o_down")
    }

    pub fn is_disconnected(&self) -> bool {
        self.has_flag("disconnected")
    }

    /// A primary report we are willing to connect to
    pub fn is_usable_primary(&self, min_other_sentinels: usize) -> bool {
        self.endpoint.is_some()
            && self.is_master()
            && !self.is_down()
            && self.num_other_sentinels >= min_other_sentinels
    }

    pub fn is_usable_replica(&self) -> bool {
        self.endpoint.is_some() && !self.is_down() && !self.is_disconnected()
    }
}
