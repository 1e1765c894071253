/// Pooled store connections backed by the `redis` crate
use super::{classify_redis_error, ConnectionFactory, PooledConnection};
use crate::core::locator::ConnectionLocator;
use crate::error::{SentinelError, SentinelResult};
use redis::aio::MultiplexedConnection;
use redis::{Client, Cmd, FromRedisValue};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::debug;

const DEFAULT_MAX_IDLE: usize = 8;

/// Opens [`RedisConnection`]s; every connect validates reachability by
/// establishing the first pooled socket.
#[derive(Debug, Clone)]
pub struct RedisConnectionFactory {
    command_timeout: Duration,
    max_idle: usize,
}

impl RedisConnectionFactory {
    pub fn new(command_timeout: Duration) -> Self {
        Self {
            command_timeout,
            max_idle: DEFAULT_MAX_IDLE,
        }
    }

    pub fn with_max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = max_idle.max(1);
        self
    }
}

impl Default for RedisConnectionFactory {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait::async_trait]
impl ConnectionFactory for RedisConnectionFactory {
    type Connection = RedisConnection;

    async fn connect(&self, locator: &ConnectionLocator) -> SentinelResult<RedisConnection> {
        let client = Client::open(locator.connection_info()?).map_err(|e| classify_redis_error(&e))?;

        let connection = RedisConnection {
            locator: locator.clone(),
            client,
            idle: Mutex::new(Vec::new()),
            command_timeout: self.command_timeout,
            max_idle: self.max_idle,
        };

        let first = connection.open().await?;
        connection.checkin(first).await;
        Ok(connection)
    }
}

/// A client for one node plus its idle socket pool
pub struct RedisConnection {
    locator: ConnectionLocator,
    client: Client,
    idle: Mutex<Vec<MultiplexedConnection>>,
    command_timeout: Duration,
    max_idle: usize,
}

impl RedisConnection {
    /// Run one command, classifying failures for the failover wrapper.
    /// Sockets that hit a fatal error are discarded instead of pooled.
    pub async fn query<T: FromRedisValue>(&self, cmd: &Cmd) -> SentinelResult<T> {
        let mut conn = self.checkout().await?;

        match timeout(self.command_timeout, cmd.query_async::<T>(&mut conn)).await {
            Ok(Ok(value)) => {
                self.checkin(conn).await;
                Ok(value)
            }
            Ok(Err(e)) => {
                let err = classify_redis_error(&e);
                if !err.is_fatal_connection() {
                    self.checkin(conn).await;
                }
                Err(err)
            }
            Err(_) => Err(SentinelError::timeout(format!(
                "command on {}",
                self.locator.endpoint
            ))),
        }
    }

    /// Number of sockets currently parked in the pool
    pub async fn idle_count(&self) -> usize {
        self.idle.lock().await.len()
    }

    async fn open(&self) -> SentinelResult<MultiplexedConnection> {
        debug!("Opening store connection to {}", self.locator);

        match timeout(self.command_timeout, self.client.get_multiplexed_async_connection()).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => Err(classify_redis_error(&e)),
            Err(_) => Err(SentinelError::timeout(format!(
                "connect to {}",
                self.locator.endpoint
            ))),
        }
    }

    async fn checkout(&self) -> SentinelResult<MultiplexedConnection> {
        if let Some(conn) = self.idle.lock().await.pop() {
            return Ok(conn);
        }
        self.open().await
    }

    async fn checkin(&self, conn: MultiplexedConnection) {
        let mut idle = self.idle.lock().await;
        if idle.len() < self.max_idle {
            idle.push(conn);
        }
    }
}

#[async_trait::async_trait]
impl PooledConnection for RedisConnection {
    fn locator(&self) -> &ConnectionLocator {
        &self.locator
    }

    async fn disconnect_idle(&self) -> usize {
        let mut idle = self.idle.lock().await;
        let closed = idle.len();
        // Dropping the last handle of a multiplexed connection closes its socket
        idle.clear();
        debug!("Closed {} idle connections to {}", closed, self.locator);
        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Endpoint;
    use crate::testing::{resp, FakeRedisServer};
    use std::time::Instant;

    fn locator_for(server: &FakeRedisServer) -> ConnectionLocator {
        ConnectionLocator::new(
            Endpoint::new("127.0.0.1", server.addr().port()),
            None,
            "0",
        )
    }

    #[tokio::test]
    async fn test_connect_and_query() {
        let server = FakeRedisServer::start(|cmd| match cmd[0].to_ascii_uppercase().as_str() {
            "PING" => Some(resp::simple("PONG")),
            _ => Some(resp::simple("OK")),
        })
        .await;

        let factory = RedisConnectionFactory::new(Duration::from_secs(2));
        let conn = factory.connect(&locator_for(&server)).await.unwrap();
        assert_eq!(conn.idle_count().await, 1);

        let pong: String = conn.query(&redis::cmd("PING")).await.unwrap();
        assert_eq!(pong, "PONG");
        assert_eq!(conn.idle_count().await, 1);
        assert!(server.command_count() >= 1);
    }

    #[tokio::test]
    async fn test_read_only_reply_is_classified() {
        let server = FakeRedisServer::start(|cmd| match cmd[0].to_ascii_uppercase().as_str() {
            "SET" => Some(resp::error("READONLY You can't write against a read only replica.")),
            _ => Some(resp::simple("OK")),
        })
        .await;

        let factory = RedisConnectionFactory::new(Duration::from_secs(2));
        let conn = factory.connect(&locator_for(&server)).await.unwrap();

        let result: SentinelResult<()> = conn.query(redis::cmd("SET").arg("k").arg("v")).await;
        assert!(matches!(result, Err(SentinelError::ReadOnly { .. })));
        // The socket that saw the fatal error is not returned to the pool
        assert_eq!(conn.idle_count().await, 0);
    }

    #[tokio::test]
    async fn test_disconnect_idle() {
        let server = FakeRedisServer::start(|_| Some(resp::simple("OK"))).await;

        let factory = RedisConnectionFactory::new(Duration::from_secs(2));
        let conn = factory.connect(&locator_for(&server)).await.unwrap();

        assert_eq!(conn.disconnect_idle().await, 1);
        assert_eq!(conn.disconnect_idle().await, 0);
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let factory = RedisConnectionFactory::new(Duration::from_millis(500));
        let locator = ConnectionLocator::new(Endpoint::new("127.0.0.1", 1), None, "0");

        match factory.connect(&locator).await {
            Err(e) => assert!(e.is_fatal_connection()),
            Ok(_) => panic!("expected connection failure"),
        }
    }

    #[tokio::test]
    async fn test_stalled_command_times_out() {
        let server = FakeRedisServer::start(|cmd| match cmd[0].to_ascii_uppercase().as_str() {
            "GET" => Some(resp::no_reply()),
            _ => Some(resp::simple("OK")),
        })
        .await;

        let factory = RedisConnectionFactory::new(Duration::from_millis(200));
        let conn = factory.connect(&locator_for(&server)).await.unwrap();

        let started = Instant::now();
        let result: SentinelResult<String> = conn.query(redis::cmd("GET").arg("k")).await;

        assert!(matches!(result, Err(SentinelError::Timeout { .. })));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(conn.idle_count().await, 0);
    }

    #[tokio::test]
    async fn test_password_is_sent_verbatim() {
        let server = FakeRedisServer::start(|_| Some(resp::simple("OK"))).await;
        let factory = RedisConnectionFactory::new(Duration::from_secs(2));

        for secret in ["pa/ss", "p#w", "a%41b"] {
            let locator = ConnectionLocator::new(
                Endpoint::new("127.0.0.1", server.addr().port()),
                Some(secret.to_string()),
                "0",
            );
            factory.connect(&locator).await.unwrap();

            let auth = vec!["AUTH".to_string(), secret.to_string()];
            assert!(server.commands().contains(&auth), "missing AUTH for {}", secret);
        }
    }

    #[tokio::test]
    async fn test_idle_pool_is_capped() {
        let server = FakeRedisServer::start(|cmd| match cmd[0].to_ascii_uppercase().as_str() {
            "PING" => Some(resp::simple("PONG")),
            _ => Some(resp::simple("OK")),
        })
        .await;

        let factory = RedisConnectionFactory::new(Duration::from_secs(2)).with_max_idle(1);
        let conn = factory.connect(&locator_for(&server)).await.unwrap();

        // The second query finds the pool empty and opens another socket
        let ping = redis::cmd("PING");
        let (a, b): (SentinelResult<String>, SentinelResult<String>) =
            tokio::join!(conn.query(&ping), conn.query(&ping));
        assert_eq!(a.unwrap(), "PONG");
        assert_eq!(b.unwrap(), "PONG");
        assert_eq!(conn.idle_count().await, 1);
    }
}
