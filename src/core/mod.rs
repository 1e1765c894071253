/// Core failover logic: descriptor parsing, replica selection, the
/// connection manager and its failover-recovery wrapper
pub mod descriptor;
pub mod failover;
pub mod locator;
pub mod manager;
pub mod selection;

#[cfg(test)]
pub(crate) mod mock;

use std::fmt;

/// A `host:port` pair, either a sentinel or a data node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Strict `host:port` split; `None` on anything else
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(host), Some(port), None) if !host.is_empty() => {
                let port = port.parse::<u16>().ok()?;
                Some(Self::new(host, port))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl From<(String, u16)> for Endpoint {
    fn from((host, port): (String, u16)) -> Self {
        Self { host, port }
    }
}
