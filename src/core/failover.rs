/// Failover recovery for store operations
///
/// Every cache-level operation runs through
/// [`SentinelConnectionManager::with_failover_recovery`]. A transport failure,
/// a read-only reply from a demoted primary, an interrupted backend or a
/// timeout resets the manager and surfaces as
/// [`SentinelError::StaleConnection`]; every other error passes through
/// unchanged.
use crate::core::manager::SentinelConnectionManager;
use crate::error::{SentinelError, SentinelResult};
use crate::sentinel::MonitorFactory;
use crate::store::pool::RedisConnectionFactory;
use crate::store::ConnectionFactory;
use redis::{Cmd, FromRedisValue};
use std::future::Future;
use std::sync::Arc;
use tracing::warn;

impl<M: MonitorFactory, F: ConnectionFactory> SentinelConnectionManager<M, F> {
    /// Await `operation`, resetting cached connections on a fatal
    /// connection error and re-tagging it as stale.
    pub async fn with_failover_recovery<T, Fut>(&self, operation: Fut) -> SentinelResult<T>
    where
        Fut: Future<Output = SentinelResult<T>>,
    {
        match operation.await {
            Err(e) if e.is_fatal_connection() => {
                warn!("[{}] {}, closing old connections", e.severity(), e);
                self.reset().await;
                Err(SentinelError::stale(format!("Error: {}, closing old connections", e)))
            }
            other => other,
        }
    }

    /// Fetch the connection for `write` and run `op` on it, all under
    /// failover recovery.
    pub async fn execute<T, Op, Fut>(&self, write: bool, op: Op) -> SentinelResult<T>
    where
        Op: FnOnce(Arc<F::Connection>) -> Fut,
        Fut: Future<Output = SentinelResult<T>>,
    {
        self.with_failover_recovery(async move {
            let conn = self.get_connection(write).await?;
            op(conn).await
        })
        .await
    }
}

impl<M: MonitorFactory> SentinelConnectionManager<M, RedisConnectionFactory> {
    /// Run one command against the primary (`write`) or a replica
    pub async fn query<T: FromRedisValue>(&self, write: bool, cmd: &Cmd) -> SentinelResult<T> {
        self.execute(write, |conn| async move { conn.query::<T>(cmd).await })
            .await
    }
}
