/// Data connections to the primary or a replica
pub mod pool;

use crate::core::locator::ConnectionLocator;
use crate::error::{ConfigError, SentinelError, SentinelResult};
use redis::{ErrorKind, RedisError};
use std::io;

/// Opens a store connection for a locator
#[async_trait::async_trait]
pub trait ConnectionFactory: Send + Sync {
    type Connection: PooledConnection;

    async fn connect(&self, locator: &ConnectionLocator) -> SentinelResult<Self::Connection>;
}

/// A store connection that keeps a pool of idle sockets
#[async_trait::async_trait]
pub trait PooledConnection: Send + Sync + 'static {
    /// Where this connection points
    fn locator(&self) -> &ConnectionLocator;

    /// Sever every idle pooled socket; returns how many were closed
    async fn disconnect_idle(&self) -> usize;
}

/// Map a `redis` crate error onto the failover taxonomy
pub fn classify_redis_error(err: &RedisError) -> SentinelError {
    if err.is_timeout() {
        return SentinelError::timeout(err.to_string());
    }

    match err.code() {
        Some("READONLY") => return SentinelError::read_only(err.to_string()),
        Some("LOADING") | Some("MASTERDOWN") | Some("TRYAGAIN") => {
            return SentinelError::interrupted(err.to_string())
        }
        _ => {}
    }

    if err.is_connection_refusal() {
        return SentinelError::Transport(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            err.to_string(),
        ));
    }

    if err.is_connection_dropped() || err.is_io_error() {
        return SentinelError::Transport(io::Error::new(
            io::ErrorKind::ConnectionReset,
            err.to_string(),
        ));
    }

    if err.kind() == ErrorKind::InvalidClientConfig {
        return SentinelError::Config(ConfigError::ValidationError(err.to_string()));
    }

    SentinelError::command(err.to_string())
}
