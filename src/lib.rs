pub mod config;
pub mod error;
/// sentinel-cache - failover-aware connection manager for Redis Sentinel
///
/// Given a descriptor of the form `<cluster>/<sentinel>:<port>,.../<db>`, the
/// manager asks the sentinels for the current primary (writes) or a replica
/// (reads), caches one connection of each kind, and drops both whenever a
/// store operation reports that its connection has gone stale:
/// 1. Discovery: `SENTINEL MASTER` / `SENTINEL SLAVES` through the sentinel quorum
/// 2. Recovery: transport, read-only and interrupted errors reset the cached
///    connections and surface as `SentinelError::StaleConnection`
pub mod core;
pub mod sentinel;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::config::{Config, ReadStrategy, SentinelOptions};
pub use crate::core::descriptor::ConnectionDescriptor;
pub use crate::core::locator::ConnectionLocator;
pub use crate::core::manager::SentinelConnectionManager;
pub use crate::core::Endpoint;
pub use crate::error::{SentinelError, SentinelResult};

use crate::sentinel::client::RedisSentinelFactory;
use crate::store::pool::RedisConnectionFactory;

/// Manager wired to real sentinels and `redis` data connections
pub type RedisSentinelManager = SentinelConnectionManager<RedisSentinelFactory, RedisConnectionFactory>;

/// Build a [`RedisSentinelManager`] from a loaded configuration
pub fn manager_from_config(config: &Config) -> SentinelResult<RedisSentinelManager> {
    SentinelConnectionManager::new(
        config.connection.descriptor.clone(),
        config.sentinel.clone(),
        RedisSentinelFactory::new(config.sentinel.min_other_sentinels),
        RedisConnectionFactory::new(config.store.command_timeout()),
    )
}
