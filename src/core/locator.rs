/// Data connection locator
use crate::core::Endpoint;
use crate::error::{ConfigError, SentinelResult};
use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use std::fmt;

/// Everything the connection factory needs to open a store connection:
/// scheme, optional auth, host, port and database index.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionLocator {
    pub endpoint: Endpoint,
    pub password: Option<String>,
    pub db: String,
}

impl ConnectionLocator {
    pub fn new(endpoint: Endpoint, password: Option<String>, db: impl Into<String>) -> Self {
        Self {
            endpoint,
            password,
            db: db.into(),
        }
    }

    /// Parameters handed to the `redis` client. The secret is carried
    /// verbatim rather than through URL userinfo.
    pub fn connection_info(&self) -> SentinelResult<ConnectionInfo> {
        let db = self.db.parse::<i64>().map_err(|_| {
            ConfigError::ValidationError(format!("invalid database index '{}'", self.db))
        })?;
        Ok(node_connection_info(&self.endpoint, self.password.as_deref(), db))
    }

    /// `redis://[:password@]host:port/db`, for display
    pub fn url(&self) -> String {
        match &self.password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                password, self.endpoint.host, self.endpoint.port, self.db
            ),
            None => format!(
                "redis://{}:{}/{}",
                self.endpoint.host, self.endpoint.port, self.db
            ),
        }
    }

    /// URL with the secret replaced, safe for logs
    pub fn masked(&self) -> String {
        match self.password {
            Some(_) => format!(
                "redis://:***@{}:{}/{}",
                self.endpoint.host, self.endpoint.port, self.db
            ),
            None => self.url(),
        }
    }
}

/// TCP connection parameters for one node, sentinel or data
pub(crate) fn node_connection_info(
    endpoint: &Endpoint,
    password: Option<&str>,
    db: i64,
) -> ConnectionInfo {
    ConnectionInfo {
        addr: ConnectionAddr::Tcp(endpoint.host.clone(), endpoint.port),
        redis: RedisConnectionInfo {
            db,
            password: password.map(str::to_string),
            ..Default::default()
        },
    }
}

// Debug must never leak the password
impl fmt::Debug for ConnectionLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConnectionLocator").field(&self.masked()).finish()
    }
}

impl fmt::Display for ConnectionLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}
